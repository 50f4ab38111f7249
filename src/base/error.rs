//! Domain errors raised while answering a chat command.

use thiserror::Error;

use super::types::Err;

/// Errors the query engine converts into user-visible replies.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The upstream listing source could not be reached or returned unparseable data.
    #[error("event source unavailable")]
    SourceUnavailable(#[source] Err),
    /// The favorites backend failed.
    #[error("favorites store unavailable")]
    StoreUnavailable(#[source] Err),
    /// The user's input was not understood.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
