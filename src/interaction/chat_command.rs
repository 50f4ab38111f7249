//! Dispatch of chat messages from the transport to the query engine.

use tokio::task::JoinHandle;
use tracing::{Instrument, error, instrument};

use crate::{base::types::Void, service::chat::ChatClient};

use super::query::QueryEngine;

/// Handles a chat command.
///
/// The command is answered on a new task; the reply is posted to `channel_id`.
/// The returned handle may be awaited or dropped.
#[instrument(skip_all, fields(user_id = %user_id, channel_id = %channel_id))]
pub fn handle_chat_command(user_id: String, channel_id: String, text: String, engine: QueryEngine, chat: ChatClient) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            // Process the command.
            let result = handle_chat_command_internal(&user_id, &channel_id, &text, &engine, &chat).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {}", err);
            }
        }
        .in_current_span(),
    )
}

/// Internal function to answer a chat command.
#[instrument(skip_all)]
async fn handle_chat_command_internal(user_id: &str, channel_id: &str, text: &str, engine: &QueryEngine, chat: &ChatClient) -> Void {
    let reply = engine.handle_text(user_id, text).await;

    chat.send_reply(channel_id, &reply).await
}
