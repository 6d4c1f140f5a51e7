//! Platform Event Handler
//!
//! Receives events from an [`EventSource`] one at a time and turns matching
//! messages into trigger replies.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::platform::{EventSource, InboundMessage, PlatformEvent, ReactionEvent};
use crate::triggers::{ResponseSelector, TriggerStore};

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// What handling a single event amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Session ready, logged
    Ready,
    /// Sender or reactor is automated
    IgnoredAutomated,
    /// Message matched no trigger
    NoMatch,
    /// Reply sent for a trigger
    Replied { trigger_id: String, response: String },
    /// Reaction logged, no further action
    ReactionLogged,
    /// Partial payload could not be resolved
    Dropped,
}

/// Direction of a reaction event, for log lines
#[derive(Debug, Clone, Copy)]
enum ReactionChange {
    Added,
    Removed,
}

/// Routes platform events to the trigger engine
pub struct EventDispatcher {
    store: Arc<TriggerStore>,
    selector: ResponseSelector,
}

impl EventDispatcher {
    pub fn new(store: Arc<TriggerStore>) -> Self {
        Self::with_selector(store, ResponseSelector::new())
    }

    pub fn with_selector(store: Arc<TriggerStore>, selector: ResponseSelector) -> Self {
        Self { store, selector }
    }

    /// Spawn the receive loop for `source`.
    ///
    /// Events are handled sequentially. When the stream ends (or cannot be
    /// started) the loop waits and starts it again.
    pub fn start(self: Arc<Self>, source: Arc<dyn EventSource>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Listening for events on {}", source.name());

            loop {
                let Some(mut stream) = source.start_receiving() else {
                    warn!(
                        "Failed to start event stream for {}, retrying in {:?}",
                        source.name(),
                        STREAM_RECONNECT_DELAY
                    );
                    sleep(STREAM_RECONNECT_DELAY).await;
                    continue;
                };

                while let Some(event) = stream.next().await {
                    let kind = event.kind();
                    match self.dispatch(source.as_ref(), event).await {
                        Ok(outcome) => debug!("Handled {} event: {:?}", kind, outcome),
                        Err(e) => error!("Error handling {} event: {:#}", kind, e),
                    }
                    // Continue processing next event regardless of error
                }

                warn!(
                    "Event stream ended for {}, restarting in {:?}",
                    source.name(),
                    STREAM_RECONNECT_DELAY
                );
                sleep(STREAM_RECONNECT_DELAY).await;
            }
        })
    }

    /// Handle a single platform event
    pub async fn dispatch(
        &self,
        source: &dyn EventSource,
        event: PlatformEvent,
    ) -> Result<DispatchOutcome> {
        match event {
            PlatformEvent::Ready(ready) => {
                info!("Bot logged in as {}", ready.user_tag);
                info!("Serving {} guild(s)", ready.guild_count);
                Ok(DispatchOutcome::Ready)
            }
            PlatformEvent::MessageCreated(message) => self.handle_message(source, &message).await,
            PlatformEvent::ReactionAdded(reaction) => {
                Ok(handle_reaction(source, reaction, ReactionChange::Added).await)
            }
            PlatformEvent::ReactionRemoved(reaction) => {
                Ok(handle_reaction(source, reaction, ReactionChange::Removed).await)
            }
        }
    }

    async fn handle_message(
        &self,
        source: &dyn EventSource,
        message: &InboundMessage,
    ) -> Result<DispatchOutcome> {
        if message.author.bot {
            return Ok(DispatchOutcome::IgnoredAutomated);
        }

        info!(
            "[{}] {}: {}",
            message.location.guild_label(),
            message.author.tag,
            message.content
        );

        let Some(trigger) = self
            .store
            .find_matching_trigger(&message.content, message.channel_id())
        else {
            return Ok(DispatchOutcome::NoMatch);
        };

        let response = self.selector.select(trigger);
        debug!(
            "Trigger '{}' matched message {} in {}",
            trigger.id,
            message.id,
            message.channel_id()
        );

        source
            .reply(message, response)
            .await
            .with_context(|| format!("Failed to reply for trigger '{}'", trigger.id))?;
        debug!(
            "Replied to message {} {}ms after receipt",
            message.id,
            message.elapsed().num_milliseconds()
        );

        Ok(DispatchOutcome::Replied {
            trigger_id: trigger.id.clone(),
            response: response.to_string(),
        })
    }
}

async fn handle_reaction(
    source: &dyn EventSource,
    reaction: ReactionEvent,
    change: ReactionChange,
) -> DispatchOutcome {
    let reaction = if reaction.is_partial() {
        match source.resolve_reaction(reaction).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Failed to fetch reaction: {:#}", e);
                return DispatchOutcome::Dropped;
            }
        }
    } else {
        reaction
    };

    let Some(user) = reaction.user.as_ref() else {
        error!("Reaction on {} resolved without a user", reaction.message_id);
        return DispatchOutcome::Dropped;
    };

    if user.bot {
        return DispatchOutcome::IgnoredAutomated;
    }

    let guild = reaction.location.guild_label();
    match change {
        ReactionChange::Added => info!(
            "[Reaction+] {} added {} to message in {}",
            user.tag,
            reaction.emoji.display(),
            guild
        ),
        ReactionChange::Removed => info!(
            "[Reaction-] {} removed {} from message in {}",
            user.tag,
            reaction.emoji.display(),
            guild
        ),
    }

    DispatchOutcome::ReactionLogged
}
