//! User-facing reply texts.

/// Default greeting and usage text.
pub const WELCOME_MESSAGE: &str = r#####"👋 Welcome! I list club events for a day.

• `today`, `tomorrow`, `prev`, `next` move between days
• `2025-01-31` (or `31.01.2025`) jumps to a date
• `search <name or club>` searches the day you are looking at
• `more` shows the next page of results
• `fav <id>` saves or unsaves an event, `favs` lists your favorites
• `reset` starts over"#####;

/// Shown when a day or search has no events.
pub const NO_EVENTS: &str = "No events found.";

/// Shown when a search has no matches.
pub const NO_MATCHES: &str = "No matching events found.";

/// Prompt for search text after an empty search.
pub const SEARCH_PROMPT: &str = "🔍 Please enter the event name or club:";

/// Shown when `more` has nothing left to page through.
pub const NO_MORE_RESULTS: &str = "Nothing more to show. Try `next` for the following day.";

/// Shown when a user lists favorites but has none.
pub const NO_FAVORITES: &str = "No favorites saved.";

/// Shown when the listing source fails.
pub const SOURCE_UNAVAILABLE: &str = "😕 Sorry, the event listings could not be reached. Please try again later.";

/// Shown when the favorites backend fails.
pub const STORE_UNAVAILABLE: &str = "😕 Favorites are unavailable right now. Browsing still works, please try again later.";

/// Shown when favorites are switched off.
pub const FAVORITES_DISABLED: &str = "Favorites are not enabled for this bot.";

/// Shown after a session reset.
pub const SESSION_RESET: &str = "Session cleared. Send `today` to start browsing again.";
