//! Runtime services and shared state for the events-bot.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    base::{
        clock::ZonedClock,
        config::Config,
        types::{Res, Void},
    },
    interaction::query::QueryEngine,
    service::{chat::ChatClient, db::DbClient, source::EventSourceClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the service clients, and the query engine.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The favorites database client, when favorites are enabled.
    pub db: Option<DbClient>,
    /// The event listing source.
    pub source: EventSourceClient,
    /// The query engine answering commands.
    pub engine: QueryEngine,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = if config.favorites_enabled {
            Some(DbClient::surreal(&config).await?)
        } else {
            info!("Favorites are disabled.");
            None
        };

        // Initialize the event source.
        let source = EventSourceClient::resident_advisor(&config)?;

        // Initialize the query engine.
        let clock = Arc::new(ZonedClock::new(config.tz()?));
        let engine = QueryEngine::new(&config, source.clone(), db.clone(), clock);

        // Initialize the slack client.
        let chat = ChatClient::slack(&config, engine.clone()).await?;

        Ok(Self { config, db, source, engine, chat })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
