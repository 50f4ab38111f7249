pub mod surreal;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{FavoriteEntry, Res, Void};

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines the favorites store: a durable mapping from a user id to the
/// events they saved. Implementations must keep at most one entry per
/// `(user_id, event_id)` pair.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Saves a favorite; saving an event the user already saved is a no-op.
    async fn add_favorite(&self, entry: &FavoriteEntry) -> Void;

    /// Removes a favorite; removing an absent favorite is a no-op.
    async fn remove_favorite(&self, user_id: &str, event_id: &str) -> Void;

    /// Whether the user has saved the event.
    async fn is_favorite(&self, user_id: &str, event_id: &str) -> Res<bool>;

    /// Lists the user's favorites, oldest first.
    async fn list_favorites(&self, user_id: &str) -> Res<Vec<FavoriteEntry>>;
}

// Structs.

/// Database client for events-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    pub inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
