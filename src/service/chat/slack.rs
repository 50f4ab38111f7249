//! Slack chat transport for events-bot.
//!
//! This module connects the bot to Slack over socket mode:
//! - Direct messages and @-mentions are parsed as commands
//! - The `/events` slash command is acknowledged, then answered in the channel
//! - Navigation buttons under a reply send their command back as a click
//!
//! Replies are rendered as Block Kit sections, followed by an actions block when
//! the reply offers navigation.

use crate::{
    base::{
        config::Config,
        types::{Reply, Res, Void},
    },
    interaction::{self, query::QueryEngine},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

/// Slack limits a section's text to 3000 characters.
const MAX_SECTION_CHARS: usize = 3000;

/// Navigation buttons: action id, label, command text.
const NAVIGATION_BUTTONS: [(&str, &str, &str); 4] = [
    ("events_prev", "⬅️ Previous Day", "prev"),
    ("events_today", "📅 Today", "today"),
    ("events_next", "➡️ Next Day", "next"),
    ("events_search", "🔍 Search", "search"),
];

const MORE_BUTTON: (&str, &str, &str) = ("events_more", "➕ More", "more");

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config, engine: QueryEngine) -> Res<Self> {
        let client = SlackChatClient::new(config, engine).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    engine: QueryEngine,
    chat: ChatClient,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub bot_user_id: String,
    pub client: Arc<FullClient>,
    pub engine: QueryEngine,
}

impl Deref for SlackChatClient {
    type Target = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config, engine: QueryEngine) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            engine,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            engine: self.engine.clone(),
            chat: ChatClient::from(self.clone()),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, reply))]
    async fn send_reply(&self, channel_id: &str, reply: &Reply) -> Void {
        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), render_reply(reply)).with_unfurl_links(false);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Rendering.

/// Render a reply as Block Kit content, with plain text as the notification fallback.
fn render_reply(reply: &Reply) -> SlackMessageContent {
    let mut blocks: Vec<SlackBlock> = chunk_text(&reply.text, MAX_SECTION_CHARS)
        .into_iter()
        .map(|chunk| SlackBlock::Section(SlackSectionBlock::new().with_text(SlackBlockText::MarkDown(SlackBlockMarkDownText::new(chunk)))))
        .collect();

    if reply.navigation {
        let mut buttons = NAVIGATION_BUTTONS.to_vec();

        if reply.has_more {
            buttons.push(MORE_BUTTON);
        }

        let elements = buttons
            .into_iter()
            .map(|(action_id, label, command)| {
                SlackActionBlockElement::Button(
                    SlackBlockButtonElement::new(SlackBlockPlainTextOnly::from(SlackBlockPlainText::new(label.to_string())))
                        .with_action_id(SlackActionId(action_id.to_string()))
                        .with_value(command.to_string()),
                )
            })
            .collect();

        blocks.push(SlackBlock::Actions(SlackActionsBlock::new(elements)));
    }

    SlackMessageContent::new().with_text(reply.text.clone()).with_blocks(blocks)
}

/// Split text into chunks of at most `max` characters, preferring paragraph breaks.
fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let separator = if current.is_empty() { 0 } else { 2 };

        if !current.is_empty() && current.chars().count() + separator + paragraph.chars().count() > max {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);

        // A single oversized paragraph is cut on character boundaries.
        while current.chars().count() > max {
            let split = current.char_indices().nth(max).map(|(i, _)| i).unwrap_or(current.len());
            let rest = current.split_off(split);
            chunks.push(std::mem::replace(&mut current, rest));
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Remove `<@BOT>` mentions from a message.
fn strip_mention(text: &str, bot_user_id: &str) -> String {
    text.replace(&format!("<@{bot_user_id}>"), "").trim().to_string()
}

// Socket mode listener callbacks for Slack.

/// Handles the `/events` slash command.
#[instrument(skip_all)]
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    info!("Received slash command `{}` ...", event.command.0);

    let text = event.text.clone().unwrap_or_default();
    interaction::chat_command::handle_chat_command(event.user_id.0.clone(), event.channel_id.0.clone(), text, user_state.engine.clone(), user_state.chat.clone());

    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("🔎 Looking that up…".into())))
}

/// Handles button clicks from Slack.
#[instrument(skip_all)]
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackInteractionEvent::BlockActions(block_actions_event) => {
            let user_id = block_actions_event.user.as_ref().map(|u| u.id.0.clone()).ok_or(anyhow::anyhow!("Failed to get user ID"))?;
            let channel_id = block_actions_event.channel.as_ref().map(|c| c.id.0.clone()).ok_or(anyhow::anyhow!("Failed to get channel ID"))?;

            for action in block_actions_event.actions.iter().flatten() {
                let Some(command) = action.value.clone() else {
                    warn!("Skipping action `{}` without a value.", action.action_id.0);
                    continue;
                };

                info!("Received button `{}` ...", action.action_id.0);

                interaction::chat_command::handle_chat_command(user_id.clone(), channel_id.clone(), command, user_state.engine.clone(), user_state.chat.clone());
            }
        }
        _ => {
            warn!("Received unhandled interaction event.")
        }
    }

    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            // Only plain direct messages are commands; edits, joins, and channel chatter are not.
            if slack_message_event.subtype.is_some() || slack_message_event.sender.bot_id.is_some() {
                return Ok(());
            }

            let is_direct = slack_message_event.origin.channel_type.as_ref().is_some_and(|t| t.0 == "im");
            if !is_direct {
                return Ok(());
            }

            let Some(user_id) = slack_message_event.sender.user.as_ref().map(|u| u.0.clone()) else {
                warn!("Skipping message event without a user.");
                return Ok(());
            };

            if user_id == user_state.chat.bot_user_id() {
                return Ok(());
            }

            info!("Received direct message ...");

            let channel_id = slack_message_event.origin.channel.as_ref().ok_or(anyhow::anyhow!("Failed to get channel ID"))?.0.to_owned();
            let text = slack_message_event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();

            interaction::chat_command::handle_chat_command(user_id, channel_id, text, user_state.engine.clone(), user_state.chat.clone());
        }
        SlackEventCallbackBody::AppMention(slack_app_mention_event) => {
            info!("Received app mention event ...");

            let user_id = slack_app_mention_event.user.0.to_owned();
            let channel_id = slack_app_mention_event.channel.0.to_owned();
            let text = strip_mention(slack_app_mention_event.content.text.as_deref().unwrap_or_default(), user_state.chat.bot_user_id());

            interaction::chat_command::handle_chat_command(user_id, channel_id, text, user_state.engine.clone(), user_state.chat.clone());
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.
