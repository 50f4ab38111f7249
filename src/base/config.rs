//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::base::messages;

use super::types::{Res, Void};

/// Default database endpoint (embedded, in-memory).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

/// Favorites are on unless switched off.
fn default_favorites_enabled() -> bool {
    true
}

/// Default GraphQL endpoint of the listing source.
fn default_event_source_url() -> String {
    "https://ra.co/graphql".to_string()
}

/// Default site base URL that event links are relative to.
fn default_event_source_site_url() -> String {
    "https://ra.co".to_string()
}

/// Default listing area (Berlin).
fn default_event_source_area_id() -> u32 {
    34
}

/// Default number of listings requested from the source.
fn default_event_source_page_size() -> u32 {
    20
}

/// Default upper bound on a single source request.
fn default_event_source_timeout_secs() -> u64 {
    10
}

/// Default number of events per chat reply.
fn default_events_per_page() -> usize {
    10
}

/// Default time zone for resolving "today".
fn default_timezone() -> String {
    "Europe/Berlin".to_string()
}

/// Default session inactivity timeout.
fn default_session_ttl_secs() -> u64 {
    3600
}

/// Default greeting and usage text.
fn default_welcome_message() -> String {
    messages::WELCOME_MESSAGE.to_string()
}

/// Configuration for the events-bot application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Configuration values.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `mem://` or `ws://localhost:8000`.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database root username (`DB_USERNAME`), for remote endpoints.
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database root password (`DB_PASSWORD`), for remote endpoints.
    #[serde(default)]
    pub db_password: Option<String>,
    /// Whether users can save favorites (`FAVORITES_ENABLED`).
    #[serde(default = "default_favorites_enabled")]
    pub favorites_enabled: bool,
    /// GraphQL endpoint of the listing source (`EVENT_SOURCE_URL`).
    #[serde(default = "default_event_source_url")]
    pub event_source_url: String,
    /// Base URL that relative event links are joined to (`EVENT_SOURCE_SITE_URL`).
    #[serde(default = "default_event_source_site_url")]
    pub event_source_site_url: String,
    /// Listing area identifier (`EVENT_SOURCE_AREA_ID`).
    #[serde(default = "default_event_source_area_id")]
    pub event_source_area_id: u32,
    /// Number of listings requested per source call (`EVENT_SOURCE_PAGE_SIZE`).
    #[serde(default = "default_event_source_page_size")]
    pub event_source_page_size: u32,
    /// Timeout for a single source call, in seconds (`EVENT_SOURCE_TIMEOUT_SECS`).
    #[serde(default = "default_event_source_timeout_secs")]
    pub event_source_timeout_secs: u64,
    /// Number of events shown per reply (`EVENTS_PER_PAGE`).
    #[serde(default = "default_events_per_page")]
    pub events_per_page: usize,
    /// IANA time zone used to resolve "today" (`TIMEZONE`).
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Seconds of inactivity after which a session is discarded (`SESSION_TTL_SECS`).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Greeting and usage text (`WELCOME_MESSAGE`).
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            db_endpoint: default_db_endpoint(),
            db_username: None,
            db_password: None,
            favorites_enabled: default_favorites_enabled(),
            event_source_url: default_event_source_url(),
            event_source_site_url: default_event_source_site_url(),
            event_source_area_id: default_event_source_area_id(),
            event_source_page_size: default_event_source_page_size(),
            event_source_timeout_secs: default_event_source_timeout_secs(),
            events_per_page: default_events_per_page(),
            timezone: default_timezone(),
            session_ttl_secs: default_session_ttl_secs(),
            welcome_message: default_welcome_message(),
        }
    }
}

impl Config {
    /// Load the configuration from the environment (`EVENTS_BOT_*`) and an optional TOML file.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("EVENTS_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Void {
        self.tz()?;

        if self.event_source_page_size < 1 || self.event_source_page_size > 100 {
            return Err(anyhow::anyhow!("Event source page size must be between 1 and 100."));
        }

        if self.events_per_page < 1 || self.events_per_page > 25 {
            return Err(anyhow::anyhow!("Events per page must be between 1 and 25."));
        }

        if self.event_source_timeout_secs < 1 {
            return Err(anyhow::anyhow!("Event source timeout must be at least 1 second."));
        }

        if self.session_ttl_secs < 1 {
            return Err(anyhow::anyhow!("Session TTL must be at least 1 second."));
        }

        Ok(())
    }

    /// The configured time zone.
    pub fn tz(&self) -> Res<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| anyhow::anyhow!("Invalid time zone `{}`: {}", self.timezone, e))
    }
}
