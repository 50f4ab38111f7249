//! Core components, types, and utilities for the events-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Chat commands and their parser.
//! - User-facing reply texts.
//! - Common types, errors, and the calendar clock.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod messages;
pub mod types;
