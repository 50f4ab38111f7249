//! The query engine: turns a user's command into listing lookups and a reply.

use std::{ops::Deref, sync::Arc, time::Duration};

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        clock::Clock,
        command::Command,
        config::Config,
        error::QueryError,
        messages,
        types::{Event, FavoriteEntry, Reply, SearchQuery},
    },
    service::{db::DbClient, source::EventSourceClient},
};

use super::{
    format,
    session::{ResultPage, Session, SessionStore},
};

/// Query engine for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct QueryEngine {
    inner: Arc<QueryEngineInner>,
}

impl Deref for QueryEngine {
    type Target = QueryEngineInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Shared state of the query engine.
pub struct QueryEngineInner {
    source: EventSourceClient,
    favorites: Option<DbClient>,
    clock: Arc<dyn Clock>,
    sessions: SessionStore,
    events_per_page: usize,
    welcome_message: String,
}

impl QueryEngine {
    /// Create a new query engine. Passing no favorites client disables favorites.
    pub fn new(config: &Config, source: EventSourceClient, favorites: Option<DbClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(QueryEngineInner {
                source,
                favorites,
                clock,
                sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
                events_per_page: config.events_per_page,
                welcome_message: config.welcome_message.clone(),
            }),
        }
    }

    /// The session map.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The date the user is currently browsing.
    pub async fn cursor(&self, user_id: &str) -> NaiveDate {
        self.sessions.lock(user_id, self.clock.today()).await.cursor
    }

    /// Parse a chat message and handle it.
    ///
    /// While the session waits for search text, a message that is not a command is
    /// taken as the search term.
    #[instrument(skip(self, text))]
    pub async fn handle_text(&self, user_id: &str, text: &str) -> Reply {
        let mut session = self.sessions.lock(user_id, self.clock.today()).await;
        SessionStore::touch(&mut session);

        let command = match text.parse::<Command>() {
            Err(QueryError::InvalidCommand(_)) if session.awaiting_search => Ok(Command::Search(text.trim().to_string())),
            other => other,
        };

        let result = match command {
            Ok(command) => self.execute(user_id, &mut session, command).await,
            Err(err) => Err(err),
        };

        self.into_reply(result)
    }

    /// Handle an already parsed command.
    #[instrument(skip(self))]
    pub async fn handle_command(&self, user_id: &str, command: Command) -> Reply {
        let mut session = self.sessions.lock(user_id, self.clock.today()).await;
        SessionStore::touch(&mut session);

        let result = self.execute(user_id, &mut session, command).await;

        self.into_reply(result)
    }

    async fn execute(&self, user_id: &str, session: &mut Session, command: Command) -> Result<Reply, QueryError> {
        session.awaiting_search = false;

        match command {
            Command::Help => Ok(Reply::with_navigation(self.welcome_message.clone(), false)),
            Command::Prev => {
                let date = session.cursor.pred_opt().ok_or_else(|| QueryError::InvalidCommand("there is no earlier date".to_string()))?;
                self.show_day(session, date).await
            }
            Command::Today => self.show_day(session, self.clock.today()).await,
            Command::Tomorrow => {
                let date = self.clock.today().succ_opt().ok_or_else(|| QueryError::InvalidCommand("there is no later date".to_string()))?;
                self.show_day(session, date).await
            }
            Command::Next => {
                let date = session.cursor.succ_opt().ok_or_else(|| QueryError::InvalidCommand("there is no later date".to_string()))?;
                self.show_day(session, date).await
            }
            Command::Date(date) => self.show_day(session, date).await,
            Command::Search(text) => self.search(session, &text).await,
            Command::More => Ok(self.next_page(session)),
            Command::Favorite(event_id) => self.toggle_favorite(user_id, session, event_id.trim()).await,
            Command::ListFavorites => self.list_favorites(user_id).await,
            Command::Reset => {
                self.sessions.remove(user_id).await;
                info!("Session reset.");
                Ok(Reply::text(messages::SESSION_RESET))
            }
        }
    }

    /// Fetch a day's listings; the cursor only moves once the fetch succeeds.
    async fn show_day(&self, session: &mut Session, date: NaiveDate) -> Result<Reply, QueryError> {
        let events = self.source.fetch_events(date).await.map_err(QueryError::SourceUnavailable)?;

        session.cursor = date;

        Ok(self.show_results(session, format::day_heading(date), events, messages::NO_EVENTS))
    }

    async fn search(&self, session: &mut Session, text: &str) -> Result<Reply, QueryError> {
        let text = text.trim();

        if text.is_empty() {
            session.awaiting_search = true;
            return Ok(Reply::text(format!("{}\n{}", messages::NO_MATCHES, messages::SEARCH_PROMPT)));
        }

        let query = SearchQuery::new(text, session.cursor);
        let events = self.source.search_events(&query).await.map_err(QueryError::SourceUnavailable)?;

        Ok(self.show_results(session, format::search_heading(text, query.date), events, messages::NO_MATCHES))
    }

    fn show_results(&self, session: &mut Session, heading: String, events: Vec<Event>, empty: &str) -> Reply {
        if events.is_empty() {
            session.results = None;
            return Reply::with_navigation(format!("{heading}\n\n{empty}"), false);
        }

        let results = ResultPage { heading, events, page: 0 };
        let (text, has_more) = format::format_page(&results, self.events_per_page);
        session.results = Some(results);

        Reply::with_navigation(text, has_more)
    }

    fn next_page(&self, session: &mut Session) -> Reply {
        let per_page = self.events_per_page;

        match session.results.as_mut() {
            Some(results) if results.page + 1 < format::page_count(results.events.len(), per_page) => {
                results.page += 1;
                let (text, has_more) = format::format_page(results, per_page);
                Reply::with_navigation(text, has_more)
            }
            _ => Reply::with_navigation(messages::NO_MORE_RESULTS, false),
        }
    }

    async fn toggle_favorite(&self, user_id: &str, session: &mut Session, event_id: &str) -> Result<Reply, QueryError> {
        let Some(db) = &self.favorites else {
            return Ok(Reply::text(messages::FAVORITES_DISABLED));
        };

        if db.is_favorite(user_id, event_id).await.map_err(QueryError::StoreUnavailable)? {
            db.remove_favorite(user_id, event_id).await.map_err(QueryError::StoreUnavailable)?;
            info!("Removed favorite `{}`.", event_id);
            return Ok(Reply::text(format!("Removed `{event_id}` from your favorites.")));
        }

        let event = match session.cached_event(event_id) {
            Some(event) => event.clone(),
            None => match self.source.get_event(event_id).await.map_err(QueryError::SourceUnavailable)? {
                Some(event) => event,
                None => return Ok(Reply::text(format!("No event with id `{event_id}` found."))),
            },
        };

        db.add_favorite(&FavoriteEntry::new(user_id, &event)).await.map_err(QueryError::StoreUnavailable)?;
        info!("Saved favorite `{}`.", event_id);

        Ok(Reply::text(format!("⭐ Saved *{}* to your favorites. Send `fav {}` again to remove it.", event.title, event.id)))
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Reply, QueryError> {
        let Some(db) = &self.favorites else {
            return Ok(Reply::text(messages::FAVORITES_DISABLED));
        };

        let favorites = db.list_favorites(user_id).await.map_err(QueryError::StoreUnavailable)?;

        if favorites.is_empty() {
            return Ok(Reply::text(messages::NO_FAVORITES));
        }

        Ok(Reply::text(format::format_favorites(&favorites)))
    }

    /// Every failure ends as a reply; none reaches the transport.
    fn into_reply(&self, result: Result<Reply, QueryError>) -> Reply {
        match result {
            Ok(reply) => reply,
            Err(err @ QueryError::SourceUnavailable(_)) => {
                error!("{:#}", anyhow::Error::from(err));
                Reply::with_navigation(messages::SOURCE_UNAVAILABLE, false)
            }
            Err(err @ QueryError::StoreUnavailable(_)) => {
                error!("{:#}", anyhow::Error::from(err));
                Reply::text(messages::STORE_UNAVAILABLE)
            }
            Err(QueryError::InvalidCommand(input)) => {
                warn!("Invalid command: {}", input);
                Reply::text(format!("Sorry, I couldn't handle `{}`.\n\n{}", input, self.welcome_message))
            }
        }
    }
}
