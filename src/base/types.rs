//! Common types shared across the events-bot.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The error type used by infrastructure code.
pub type Err = anyhow::Error;
/// A result carrying [`Err`].
pub type Res<T> = Result<T, Err>;
/// A result with no value.
pub type Void = Res<()>;

/// A single listed event (e.g., a club night), normalized from the listing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier assigned by the listing source.
    pub id: String,
    /// Event title.
    pub title: String,
    /// Venue or club name, if the source provides one.
    pub venue: Option<String>,
    /// The listing date.
    pub date: NaiveDate,
    /// Local start time, if known.
    pub start_time: Option<NaiveDateTime>,
    /// Local end time, if known.
    pub end_time: Option<NaiveDateTime>,
    /// Absolute link to the event page.
    pub url: Option<String>,
}

impl Event {
    /// The venue name, or a placeholder when the source has none.
    pub fn venue_name(&self) -> &str {
        self.venue.as_deref().filter(|v| !v.is_empty()).unwrap_or("Venue N/A")
    }
}

/// A saved association between a user and an event, with a snapshot of the event.
///
/// The snapshot lets favorites be listed without going back to the listing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    /// The chat user who saved the event.
    pub user_id: String,
    /// The saved event's identifier.
    pub event_id: String,
    /// Event title at the time it was saved.
    pub title: String,
    /// Venue name at the time it was saved.
    pub venue: Option<String>,
    /// The event's listing date.
    pub date: NaiveDate,
    /// Link to the event page.
    pub url: Option<String>,
    /// When the favorite was created.
    pub added_at: DateTime<Utc>,
}

impl FavoriteEntry {
    /// Snapshot `event` as a favorite of `user_id`.
    pub fn new(user_id: &str, event: &Event) -> Self {
        Self {
            user_id: user_id.to_string(),
            event_id: event.id.clone(),
            title: event.title.clone(),
            venue: event.venue.clone(),
            date: event.date,
            url: event.url.clone(),
            added_at: Utc::now(),
        }
    }
}

/// A free-text search scoped to a single listing date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// The text to look for in event titles and venue names.
    pub text: String,
    /// The date whose listings are searched.
    pub date: NaiveDate,
}

impl SearchQuery {
    /// Create a new search query.
    pub fn new(text: impl Into<String>, date: NaiveDate) -> Self {
        Self { text: text.into(), date }
    }

    /// Whether `event` matches this query (case-insensitive, on title or venue).
    ///
    /// An empty query matches nothing.
    pub fn matches(&self, event: &Event) -> bool {
        let needle = self.text.trim().to_lowercase();

        if needle.is_empty() {
            return false;
        }

        event.title.to_lowercase().contains(&needle) || event.venue.as_deref().is_some_and(|v| v.to_lowercase().contains(&needle))
    }
}

/// A reply handed back to the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// The message body, in the transport's markdown flavor.
    pub text: String,
    /// Whether day navigation controls should be offered with the reply.
    pub navigation: bool,
    /// Whether another page of results is available.
    pub has_more: bool,
}

impl Reply {
    /// A plain text reply without controls.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    /// A reply that offers day navigation controls.
    pub fn with_navigation(text: impl Into<String>, has_more: bool) -> Self {
        Self {
            text: text.into(),
            navigation: true,
            has_more,
        }
    }
}
