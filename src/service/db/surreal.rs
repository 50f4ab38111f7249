//! SurrealDB implementation for the favorites store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    types::{FavoriteEntry, Res, Void},
};

use super::{DbClient, GenericDbClient};

const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS favorite SCHEMALESS;
DEFINE INDEX IF NOT EXISTS favorite_user_event ON TABLE favorite FIELDS user_id, event_id UNIQUE;
"#;

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Creates a new SurrealDB client from the configured endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let credentials = match (&config.db_username, &config.db_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        };

        let client = SurrealDbClient::new(&config.db_endpoint, credentials).await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Creates a new embedded, in-memory SurrealDB client.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::new("mem://", None).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// Row shape for existence checks.
#[derive(Debug, Deserialize)]
struct EventIdRow {
    #[allow(dead_code)]
    event_id: String,
}

/// SurrealDB database client implementation.
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connect to `endpoint` (e.g. `mem://`, `ws://localhost:8000`) and prepare the schema.
    #[instrument(name = "SurrealDbClient::new", skip(credentials))]
    pub async fn new(endpoint: &str, credentials: Option<(&str, &str)>) -> Res<Self> {
        let db = any::connect(endpoint).await?;

        // Authenticate with the database when credentials are provided.
        if let Some((username, password)) = credentials {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns("events").use_db("bot").await?;

        // Define schemas.
        db.query(SCHEMA).await?.check()?;

        info!("Database initialized successfully.");

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, event_id = %entry.event_id))]
    async fn add_favorite(&self, entry: &FavoriteEntry) -> Void {
        if self.is_favorite(&entry.user_id, &entry.event_id).await? {
            info!("Favorite already saved.");
            return Ok(());
        }

        self.db.query("CREATE favorite CONTENT $entry").bind(("entry", entry.clone())).await?.check()?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_favorite(&self, user_id: &str, event_id: &str) -> Void {
        self.db
            .query("DELETE favorite WHERE user_id = $user_id AND event_id = $event_id")
            .bind(("user_id", user_id.to_string()))
            .bind(("event_id", event_id.to_string()))
            .await?
            .check()?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_favorite(&self, user_id: &str, event_id: &str) -> Res<bool> {
        let mut response = self
            .db
            .query("SELECT event_id FROM favorite WHERE user_id = $user_id AND event_id = $event_id LIMIT 1")
            .bind(("user_id", user_id.to_string()))
            .bind(("event_id", event_id.to_string()))
            .await?;

        let rows: Vec<EventIdRow> = response.take(0)?;

        Ok(!rows.is_empty())
    }

    #[instrument(skip(self))]
    async fn list_favorites(&self, user_id: &str) -> Res<Vec<FavoriteEntry>> {
        let mut response = self
            .db
            .query("SELECT user_id, event_id, title, venue, date, url, added_at FROM favorite WHERE user_id = $user_id ORDER BY added_at ASC")
            .bind(("user_id", user_id.to_string()))
            .await?;

        let entries: Vec<FavoriteEntry> = response.take(0)?;

        Ok(entries)
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::*;

    fn entry(user_id: &str, event_id: &str, minute: u32) -> FavoriteEntry {
        FavoriteEntry {
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            title: format!("Event {event_id}"),
            venue: Some("Tresor".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            url: None,
            added_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minute as i64),
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.add_favorite(&entry("U1", "E1", 0)).await.unwrap();
        db.add_favorite(&entry("U1", "E1", 1)).await.unwrap();

        let favorites = db.list_favorites("U1").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0], entry("U1", "E1", 0));
    }

    #[tokio::test]
    async fn test_remove_and_contains() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.add_favorite(&entry("U1", "E1", 0)).await.unwrap();
        assert!(db.is_favorite("U1", "E1").await.unwrap());

        db.remove_favorite("U1", "E1").await.unwrap();
        assert!(!db.is_favorite("U1", "E1").await.unwrap());
        assert!(db.list_favorites("U1").await.unwrap().is_empty());

        // Removing again is fine.
        db.remove_favorite("U1", "E1").await.unwrap();
    }

    #[tokio::test]
    async fn test_favorites_are_per_user_and_ordered() {
        let db = DbClient::surreal_memory().await.unwrap();

        db.add_favorite(&entry("U1", "E2", 5)).await.unwrap();
        db.add_favorite(&entry("U1", "E1", 1)).await.unwrap();
        db.add_favorite(&entry("U2", "E1", 2)).await.unwrap();

        let u1 = db.list_favorites("U1").await.unwrap();
        assert_eq!(u1.iter().map(|f| f.event_id.as_str()).collect::<Vec<_>>(), vec!["E1", "E2"]);

        let u2 = db.list_favorites("U2").await.unwrap();
        assert_eq!(u2.len(), 1);
        assert_eq!(u2[0].user_id, "U2");

        assert!(db.list_favorites("U3").await.unwrap().is_empty());
    }
}
