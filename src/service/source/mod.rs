pub mod resident_advisor;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::base::types::{Event, Res, SearchQuery};

// Traits.

/// Generic event listing source trait that clients must implement.
///
/// This trait defines how the bot reads event listings from an upstream provider.
/// Implementations normalize the provider's records into [`Event`]s and keep the
/// provider's ordering. Any error means the source is unavailable for this request.
#[async_trait]
pub trait GenericEventSource: Send + Sync + 'static {
    /// Fetch the listings for a single calendar date.
    async fn fetch_events(&self, date: NaiveDate) -> Res<Vec<Event>>;

    /// Search the listings of the query's date for events whose title or venue
    /// contains the query text.
    ///
    /// An empty query yields no events.
    async fn search_events(&self, query: &SearchQuery) -> Res<Vec<Event>>;

    /// Look up a single event by its identifier.
    async fn get_event(&self, event_id: &str) -> Res<Option<Event>>;
}

// Structs.

/// Event source client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct EventSourceClient {
    inner: Arc<dyn GenericEventSource>,
}

impl Deref for EventSourceClient {
    type Target = dyn GenericEventSource;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl EventSourceClient {
    pub fn new(inner: Arc<dyn GenericEventSource>) -> Self {
        Self { inner }
    }
}
