//! Command handling and user interactions for events-bot.
//!
//! This module provides functionality for answering chat commands:
//! - Tracking each user's browsing session
//! - Interpreting commands against the listing source and favorites store
//! - Rendering results and handing replies back to the chat transport

pub mod chat_command;
pub mod format;
pub mod query;
pub mod session;
