//! Platform event types.
//!
//! Plain data decoupled from any gateway wire format, so the dispatcher can be
//! driven by the Discord client or by a mock in tests.

use serde::{Deserialize, Serialize};

/// A message or reaction actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// User snowflake
    pub id: String,
    /// Display tag (`name` or legacy `name#1234`)
    pub tag: String,
    /// Automated (bot/webhook) identity
    pub bot: bool,
}

impl Author {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            bot: false,
        }
    }

    /// Mark as an automated identity
    pub fn bot(mut self) -> Self {
        self.bot = true;
        self
    }
}

/// Where an event happened, for log lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
}

impl Location {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: None,
            guild_name: None,
        }
    }

    pub fn with_guild(mut self, guild_id: impl Into<String>, guild_name: Option<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self.guild_name = guild_name;
        self
    }

    /// Guild name, the guild id when the name is unknown, or `DM`
    pub fn guild_label(&self) -> &str {
        match (&self.guild_name, &self.guild_id) {
            (Some(name), _) => name.as_str(),
            (None, Some(id)) => id.as_str(),
            (None, None) => "DM",
        }
    }
}

/// Message posted in a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message snowflake
    pub id: String,
    pub location: Location,
    pub author: Author,
    pub content: String,
    /// Milliseconds since epoch at receipt
    pub timestamp: i64,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        location: Location,
        author: Author,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            location,
            author,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.location.channel_id
    }

    /// Time since the message was received
    pub fn elapsed(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(chrono::Utc::now().timestamp_millis() - self.timestamp)
    }
}

/// Reaction emoji (custom emoji carry an id)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl Emoji {
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or("<unknown emoji>")
    }
}

/// Reaction added to or removed from a message.
///
/// The gateway only sends the full actor for guild reaction adds; elsewhere
/// the event carries just `user_id` and is partial until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message_id: String,
    pub location: Location,
    pub emoji: Emoji,
    pub user_id: String,
    pub user: Option<Author>,
}

impl ReactionEvent {
    pub fn new(
        message_id: impl Into<String>,
        location: Location,
        emoji: Emoji,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            location,
            emoji,
            user_id: user_id.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: Author) -> Self {
        self.user = Some(user);
        self
    }

    pub fn is_partial(&self) -> bool {
        self.user.is_none()
    }
}

/// Session established
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyInfo {
    pub user_tag: String,
    pub guild_count: usize,
}

/// Events consumed by the dispatcher
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    Ready(ReadyInfo),
    MessageCreated(InboundMessage),
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
}

impl PlatformEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::MessageCreated(_) => "message_create",
            Self::ReactionAdded(_) => "reaction_add",
            Self::ReactionRemoved(_) => "reaction_remove",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_label() {
        assert_eq!(Location::new("c").guild_label(), "DM");
        assert_eq!(Location::new("c").with_guild("g1", None).guild_label(), "g1");
        assert_eq!(
            Location::new("c")
                .with_guild("g1", Some("PostHog".to_string()))
                .guild_label(),
            "PostHog"
        );
    }

    #[test]
    fn test_reaction_partiality() {
        let reaction = ReactionEvent::new("m1", Location::new("c"), Emoji::unicode("👍"), "u1");
        assert!(reaction.is_partial());

        let resolved = reaction.with_user(Author::new("u1", "alice"));
        assert!(!resolved.is_partial());
    }

    #[test]
    fn test_author_bot_flag() {
        assert!(!Author::new("1", "alice").bot);
        assert!(Author::new("2", "hook").bot().bot);
    }

    #[test]
    fn test_message_elapsed_since_receipt() {
        let mut message = InboundMessage::new("m1", Location::new("c"), Author::new("1", "a"), "hi");
        let fresh = message.elapsed();
        assert!(fresh >= chrono::TimeDelta::zero());
        assert!(fresh < chrono::TimeDelta::seconds(5));

        message.timestamp -= 1500;
        assert!(message.elapsed() >= chrono::TimeDelta::milliseconds(1500));
    }

    #[test]
    fn test_emoji_display() {
        assert_eq!(Emoji::unicode("🦔").display(), "🦔");
        assert_eq!(Emoji::default().display(), "<unknown emoji>");
    }
}
