//! Discord client.
//!
//! Uses the Discord Gateway WebSocket for receiving events and the REST API for
//! replies and user lookups.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::SinkExt;
use futures::stream::StreamExt;
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::traits::{EventSource, EventStream};
use super::types::{
    Author, Emoji, InboundMessage, Location, PlatformEvent, ReactionEvent, ReadyInfo,
};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_HEARTBEAT_MS: u64 = 41250;

/// Intents: GUILDS (1) | GUILD_MESSAGES (512) | GUILD_MESSAGE_REACTIONS (1024)
/// | DIRECT_MESSAGES (4096) | MESSAGE_CONTENT (32768)
const GATEWAY_INTENTS: u64 = 1 | 512 | 1024 | 4096 | 32768;

const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

/// Discord client configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
}

/// Guild id → name, learned from GUILD_CREATE.
#[derive(Debug, Clone, Default)]
pub struct GuildDirectory {
    names: Arc<RwLock<HashMap<String, String>>>,
}

impl GuildDirectory {
    pub fn record(&self, guild_id: impl Into<String>, name: impl Into<String>) {
        self.names.write().insert(guild_id.into(), name.into());
    }

    pub fn name_of(&self, guild_id: &str) -> Option<String> {
        self.names.read().get(guild_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

/// Heartbeat acknowledgement tracking.
///
/// Discord answers every heartbeat with op 11. A heartbeat that is due while
/// the previous one is still unanswered means the connection is dead.
#[derive(Debug, Default)]
struct HeartbeatState {
    awaiting_ack: AtomicBool,
}

impl HeartbeatState {
    /// Mark a heartbeat as sent. Returns `false` if the last one was never acked.
    fn beat(&self) -> bool {
        !self.awaiting_ack.swap(true, Ordering::SeqCst)
    }

    fn ack(&self) {
        self.awaiting_ack.store(false, Ordering::SeqCst);
    }
}

/// Wait for the next gateway frame.
///
/// Returns `None` once the socket closes. A `dead` notification from the
/// heartbeat task or a dropped event receiver ends the session early.
async fn next_frame<S>(
    frames: &mut S,
    dead: &Notify,
    events: &mpsc::Sender<PlatformEvent>,
) -> Option<S::Item>
where
    S: futures::Stream + Unpin,
{
    tokio::select! {
        frame = frames.next() => frame,
        _ = dead.notified() => {
            warn!("Discord connection is unresponsive, ending session");
            None
        }
        _ = events.closed() => {
            debug!("Discord event channel closed");
            None
        }
    }
}

/// Discord bot client: Gateway for events, REST for actions.
pub struct DiscordClient {
    config: DiscordConfig,
    client: Client,
    polling: Arc<AtomicBool>,
    guilds: GuildDirectory,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling: Arc::new(AtomicBool::new(false)),
            guilds: GuildDirectory::default(),
        }
    }

    pub fn with_token(token: &str) -> Self {
        Self::new(DiscordConfig {
            bot_token: token.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.bot_token)
    }

    /// Start the Gateway WebSocket connection and return an event stream.
    fn start_gateway(&self) -> Option<EventStream> {
        let token = self.config.bot_token.clone();
        let client = self.client.clone();
        let polling = self.polling.clone();
        let guilds = self.guilds.clone();

        if polling.swap(true, Ordering::SeqCst) {
            warn!("Discord gateway already running");
            return None;
        }

        let (tx, rx) = mpsc::channel::<PlatformEvent>(256);

        tokio::spawn(async move {
            let _guard = scopeguard::guard((), |_| {
                polling.store(false, Ordering::SeqCst);
            });

            let gateway_url = match Self::fetch_gateway_url(&client, &token).await {
                Ok(url) => url,
                Err(e) => {
                    error!("Failed to get Discord gateway URL: {:#}", e);
                    return;
                }
            };

            info!("Connecting to Discord Gateway: {}", gateway_url);

            let ws_stream = match tokio_tungstenite::connect_async(gateway_url.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Failed to connect to Discord Gateway: {}", e);
                    return;
                }
            };

            let (ws_write, mut ws_read) = ws_stream.split();

            // Hello (op 10) carries the heartbeat interval
            let heartbeat_interval = match ws_read.next().await {
                Some(Ok(msg)) => {
                    let text = msg.to_text().unwrap_or("{}");
                    let payload: Value = serde_json::from_str(text).unwrap_or_default();
                    if payload["op"].as_u64() == Some(OP_HELLO) {
                        payload["d"]["heartbeat_interval"]
                            .as_u64()
                            .unwrap_or(DEFAULT_HEARTBEAT_MS)
                    } else {
                        warn!("Expected Hello (op 10), got: {}", text);
                        DEFAULT_HEARTBEAT_MS
                    }
                }
                _ => {
                    error!("No Hello from Discord Gateway");
                    return;
                }
            };

            debug!("Discord heartbeat interval: {}ms", heartbeat_interval);

            let writer = Arc::new(tokio::sync::Mutex::new(ws_write));
            let sequence: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
            let acks = Arc::new(HeartbeatState::default());
            let dead = Arc::new(Notify::new());

            if let Err(e) = writer
                .lock()
                .await
                .send(WsMessage::Text(identify_payload(&token).to_string().into()))
                .await
            {
                error!("Failed to send Identify: {}", e);
                return;
            }

            let hb_write = writer.clone();
            let hb_polling = polling.clone();
            let hb_sequence = sequence.clone();
            let hb_acks = acks.clone();
            let hb_dead = dead.clone();
            let heartbeat = tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(Duration::from_millis(heartbeat_interval));
                // First tick fires immediately; Identify was just sent.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if !hb_polling.load(Ordering::SeqCst) {
                        break;
                    }
                    if !hb_acks.beat() {
                        warn!("Discord heartbeat was not acknowledged");
                        hb_dead.notify_one();
                        break;
                    }
                    let payload = heartbeat_payload(*hb_sequence.lock());
                    let mut writer = hb_write.lock().await;
                    if let Err(e) = writer
                        .send(WsMessage::Text(payload.to_string().into()))
                        .await
                    {
                        warn!("Discord heartbeat failed: {}", e);
                        hb_dead.notify_one();
                        break;
                    }
                }
            });

            while let Some(msg_result) = next_frame(&mut ws_read, &dead, &tx).await {
                if !polling.load(Ordering::SeqCst) {
                    break;
                }

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Discord WebSocket error: {}", e);
                        break;
                    }
                };

                if msg.is_close() {
                    info!("Discord Gateway closed the connection: {:?}", msg);
                    break;
                }

                let text = match msg.to_text() {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                let payload: Value = match serde_json::from_str(text) {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                if let Some(seq) = payload["s"].as_u64() {
                    *sequence.lock() = Some(seq);
                }

                match payload["op"].as_u64() {
                    Some(OP_DISPATCH) => {}
                    Some(OP_HEARTBEAT) => {
                        let beat = heartbeat_payload(*sequence.lock());
                        if let Err(e) = writer
                            .lock()
                            .await
                            .send(WsMessage::Text(beat.to_string().into()))
                            .await
                        {
                            warn!("Discord heartbeat failed: {}", e);
                            break;
                        }
                        continue;
                    }
                    Some(OP_HEARTBEAT_ACK) => {
                        acks.ack();
                        continue;
                    }
                    Some(OP_RECONNECT) => {
                        info!("Discord Gateway requested reconnect");
                        break;
                    }
                    Some(OP_INVALID_SESSION) => {
                        warn!("Discord Gateway invalidated the session");
                        break;
                    }
                    other => {
                        debug!("Ignoring gateway opcode {:?}", other);
                        continue;
                    }
                }

                let Some(event_type) = payload["t"].as_str() else {
                    continue;
                };

                let Some(event) = parse_dispatch(event_type, &payload["d"], &guilds) else {
                    continue;
                };

                if tx.send(event).await.is_err() {
                    debug!("Discord event channel closed");
                    break;
                }
            }

            heartbeat.abort();
            info!("Discord gateway connection ended");
        });

        Some(Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx)))
    }

    async fn fetch_gateway_url(client: &Client, token: &str) -> Result<String> {
        let resp = client
            .get(format!("{}/gateway/bot", DISCORD_API_BASE))
            .header("Authorization", format!("Bot {}", token))
            .send()
            .await
            .context("Failed to get Discord gateway URL")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Discord gateway lookup failed ({}): {}", status, body);
        }

        let body: Value = resp.json().await?;
        let url = body["url"]
            .as_str()
            .context("Missing 'url' in gateway response")?;
        Ok(format!("{}/?v=10&encoding=json", url))
    }
}

#[async_trait]
impl EventSource for DiscordClient {
    fn name(&self) -> &str {
        "Discord"
    }

    fn start_receiving(&self) -> Option<EventStream> {
        self.start_gateway()
    }

    async fn reply(&self, message: &InboundMessage, content: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!(
                "{}/channels/{}/messages",
                DISCORD_API_BASE,
                message.channel_id()
            ))
            .header("Authorization", self.auth_header())
            .json(&reply_payload(&message.id, content))
            .send()
            .await
            .context("Failed to send Discord reply")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Discord reply failed ({}): {}", status, body);
        }
        Ok(())
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Author> {
        let resp = self
            .client
            .get(format!("{}/users/{}", DISCORD_API_BASE, user_id))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .with_context(|| format!("Failed to fetch Discord user {}", user_id))?;

        if !resp.status().is_success() {
            bail!("Discord user lookup failed ({}) for {}", resp.status(), user_id);
        }

        let body: Value = resp.json().await?;
        parse_author(&body).context("Malformed Discord user payload")
    }
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "hogbot",
                "device": "hogbot"
            }
        }
    })
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

fn reply_payload(message_id: &str, content: &str) -> Value {
    json!({
        "content": content,
        "message_reference": {
            "message_id": message_id,
            "fail_if_not_exists": false
        }
    })
}

/// `name` for migrated accounts, `name#1234` for legacy discriminators.
fn user_tag(user: &Value) -> Option<String> {
    let username = user["username"].as_str()?;
    match user["discriminator"].as_str() {
        Some(discriminator) if discriminator != "0" => {
            Some(format!("{}#{}", username, discriminator))
        }
        _ => Some(username.to_string()),
    }
}

fn parse_author(user: &Value) -> Option<Author> {
    let id = user["id"].as_str()?;
    Some(Author {
        id: id.to_string(),
        tag: user_tag(user)?,
        bot: user["bot"].as_bool().unwrap_or(false),
    })
}

fn parse_location(data: &Value, guilds: &GuildDirectory) -> Option<Location> {
    let channel_id = data["channel_id"].as_str()?;
    let mut location = Location::new(channel_id);
    if let Some(guild_id) = data["guild_id"].as_str() {
        location = location.with_guild(guild_id, guilds.name_of(guild_id));
    }
    Some(location)
}

fn parse_reaction(data: &Value, guilds: &GuildDirectory) -> Option<ReactionEvent> {
    let message_id = data["message_id"].as_str()?;
    let user_id = data["user_id"].as_str()?;
    let location = parse_location(data, guilds)?;
    let emoji = Emoji {
        id: data["emoji"]["id"].as_str().map(str::to_string),
        name: data["emoji"]["name"].as_str().map(str::to_string),
    };

    let mut reaction = ReactionEvent::new(message_id, location, emoji, user_id);
    // Only guild reaction adds carry the member object
    if let Some(user) = parse_author(&data["member"]["user"]) {
        reaction = reaction.with_user(user);
    }
    Some(reaction)
}

/// Translate a gateway dispatch (op 0) into a platform event.
fn parse_dispatch(event_type: &str, data: &Value, guilds: &GuildDirectory) -> Option<PlatformEvent> {
    match event_type {
        "READY" => Some(PlatformEvent::Ready(ReadyInfo {
            user_tag: user_tag(&data["user"]).unwrap_or_else(|| "unknown".to_string()),
            guild_count: data["guilds"].as_array().map(Vec::len).unwrap_or(0),
        })),
        "GUILD_CREATE" => {
            if let (Some(id), Some(name)) = (data["id"].as_str(), data["name"].as_str()) {
                guilds.record(id, name);
                debug!("Joined guild {} ({}), {} known", name, id, guilds.len());
            }
            None
        }
        "MESSAGE_CREATE" => {
            let message_id = data["id"].as_str()?;
            let mut author = parse_author(&data["author"])?;
            // Webhook posts are automated even without the bot flag
            if data["webhook_id"].is_string() {
                author.bot = true;
            }
            let location = parse_location(data, guilds)?;
            let content = data["content"].as_str().unwrap_or("");
            Some(PlatformEvent::MessageCreated(InboundMessage::new(
                message_id, location, author, content,
            )))
        }
        "MESSAGE_REACTION_ADD" => parse_reaction(data, guilds).map(PlatformEvent::ReactionAdded),
        "MESSAGE_REACTION_REMOVE" => {
            parse_reaction(data, guilds).map(PlatformEvent::ReactionRemoved)
        }
        _ => None,
    }
}
