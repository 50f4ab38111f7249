//! Library root for `events-bot`.
//!
//! Events-bot is a chat front-end for browsing club event listings:
//! - Step through listings day by day, or jump to a date
//! - Search a day's listings by event name or club
//! - Save favorites and list them later
//!
//! The bot integrates with Slack for chat, Resident Advisor for listings,
//! and SurrealDB for favorites. The architecture is built around
//! extensible traits that allow for different implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the events-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database, event source, and chat clients
/// - Starts the main event loop for processing commands
pub async fn start(config: Config) -> Void {
    info!("Starting events-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow::anyhow!("Failed to install the crypto provider"))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
