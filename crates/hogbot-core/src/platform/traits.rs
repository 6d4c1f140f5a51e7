//! Event Source Trait
//!
//! The seam between the dispatcher and a chat platform client.

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{Author, InboundMessage, PlatformEvent, ReactionEvent};

pub type EventStream = Pin<Box<dyn Stream<Item = PlatformEvent> + Send>>;

/// A connected chat platform that delivers events and accepts replies.
///
/// # Example
///
/// ```ignore
/// struct MySource { /* ... */ }
///
/// #[async_trait]
/// impl EventSource for MySource {
///     fn name(&self) -> &str {
///         "my-platform"
///     }
///
///     fn start_receiving(&self) -> Option<EventStream> {
///         None
///     }
///
///     async fn reply(&self, message: &InboundMessage, content: &str) -> Result<()> {
///         Ok(())
///     }
///
///     async fn fetch_user(&self, user_id: &str) -> Result<Author> {
///         anyhow::bail!("unsupported")
///     }
/// }
/// ```
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Platform display name
    fn name(&self) -> &str;

    /// Start receiving events (None if a session is already running or cannot start)
    ///
    /// The stream ends when the underlying session closes.
    fn start_receiving(&self) -> Option<EventStream>;

    /// Reply to `message` in its channel
    async fn reply(&self, message: &InboundMessage, content: &str) -> Result<()>;

    /// Fetch a user by id
    async fn fetch_user(&self, user_id: &str) -> Result<Author>;

    /// Fill in the actor of a partial reaction
    async fn resolve_reaction(&self, reaction: ReactionEvent) -> Result<ReactionEvent> {
        if !reaction.is_partial() {
            return Ok(reaction);
        }
        let user = self.fetch_user(&reaction.user_id).await?;
        Ok(reaction.with_user(user))
    }
}

/// Test/mock event source
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    /// Reply captured by [`MockEventSource`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentReply {
        pub channel_id: String,
        pub reply_to: String,
        pub content: String,
    }

    /// In-memory event source
    pub struct MockEventSource {
        events: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<PlatformEvent>>>,
        sender: parking_lot::Mutex<mpsc::UnboundedSender<PlatformEvent>>,
        sent: tokio::sync::Mutex<Vec<SentReply>>,
        users: parking_lot::Mutex<HashMap<String, Author>>,
        fail_fetch: AtomicBool,
        fail_reply: AtomicBool,
    }

    impl MockEventSource {
        pub fn new() -> Self {
            let (sender, receiver) = mpsc::unbounded_channel();
            Self {
                events: parking_lot::Mutex::new(Some(receiver)),
                sender: parking_lot::Mutex::new(sender),
                sent: tokio::sync::Mutex::new(Vec::new()),
                users: parking_lot::Mutex::new(HashMap::new()),
                fail_fetch: AtomicBool::new(false),
                fail_reply: AtomicBool::new(false),
            }
        }

        /// Queue an event for the receive stream
        pub fn push(&self, event: PlatformEvent) {
            let _ = self.sender.lock().send(event);
        }

        /// End the current stream once its queued events drain.
        ///
        /// Later pushes go to a fresh stream handed out by the next
        /// `start_receiving` call, like a gateway reconnect.
        pub fn close_stream(&self) {
            let (sender, receiver) = mpsc::unbounded_channel();
            *self.sender.lock() = sender;
            *self.events.lock() = Some(receiver);
        }

        /// Register a user returned by `fetch_user`
        pub fn add_user(&self, user: Author) {
            self.users.lock().insert(user.id.clone(), user);
        }

        /// Make every `fetch_user` call fail
        pub fn fail_fetches(&self) {
            self.fail_fetch.store(true, Ordering::SeqCst);
        }

        /// Make every `reply` call fail
        pub fn fail_replies(&self) {
            self.fail_reply.store(true, Ordering::SeqCst);
        }

        /// All replies sent so far
        pub async fn sent_replies(&self) -> Vec<SentReply> {
            self.sent.lock().await.clone()
        }
    }

    impl Default for MockEventSource {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl EventSource for MockEventSource {
        fn name(&self) -> &str {
            "mock"
        }

        fn start_receiving(&self) -> Option<EventStream> {
            let receiver = self.events.lock().take()?;
            Some(Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(
                receiver,
            )))
        }

        async fn reply(&self, message: &InboundMessage, content: &str) -> Result<()> {
            if self.fail_reply.load(Ordering::SeqCst) {
                return Err(anyhow!("mock reply failure"));
            }
            self.sent.lock().await.push(SentReply {
                channel_id: message.channel_id().to_string(),
                reply_to: message.id.clone(),
                content: content.to_string(),
            });
            Ok(())
        }

        async fn fetch_user(&self, user_id: &str) -> Result<Author> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(anyhow!("mock fetch failure"));
            }
            self.users
                .lock()
                .get(user_id)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown user {}", user_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockEventSource;
    use super::*;
    use crate::platform::types::{Emoji, Location};
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_resolve_partial_reaction() {
        let source = MockEventSource::new();
        source.add_user(Author::new("u1", "alice"));

        let reaction = ReactionEvent::new("m1", Location::new("c1"), Emoji::unicode("👍"), "u1");
        let resolved = source.resolve_reaction(reaction).await.unwrap();
        assert_eq!(resolved.user, Some(Author::new("u1", "alice")));
    }

    #[tokio::test]
    async fn test_resolve_full_reaction_skips_fetch() {
        let source = MockEventSource::new();
        source.fail_fetches();

        let reaction = ReactionEvent::new("m1", Location::new("c1"), Emoji::unicode("👍"), "u1")
            .with_user(Author::new("u1", "alice"));
        let resolved = source.resolve_reaction(reaction).await.unwrap();
        assert_eq!(resolved.user.unwrap().tag, "alice");
    }

    #[tokio::test]
    async fn test_resolve_unknown_user_fails() {
        let source = MockEventSource::new();
        let reaction = ReactionEvent::new("m1", Location::new("c1"), Emoji::unicode("👍"), "ghost");
        assert!(source.resolve_reaction(reaction).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_stream_is_handed_out_once_per_session() {
        let source = MockEventSource::new();
        source.push(PlatformEvent::Ready(crate::platform::ReadyInfo {
            user_tag: "hogbot".to_string(),
            guild_count: 1,
        }));

        let mut stream = source.start_receiving().unwrap();
        let event = stream.next().await.unwrap();
        assert_eq!(event.kind(), "ready");

        assert!(source.start_receiving().is_none());
    }

    #[tokio::test]
    async fn test_mock_close_stream_starts_a_new_session() {
        let source = MockEventSource::new();
        let mut first = source.start_receiving().unwrap();

        source.push(PlatformEvent::Ready(crate::platform::ReadyInfo {
            user_tag: "hogbot".to_string(),
            guild_count: 1,
        }));
        source.close_stream();

        assert_eq!(first.next().await.unwrap().kind(), "ready");
        assert!(first.next().await.is_none());

        source.push(PlatformEvent::Ready(crate::platform::ReadyInfo {
            user_tag: "hogbot".to_string(),
            guild_count: 2,
        }));
        let mut second = source.start_receiving().unwrap();
        match second.next().await.unwrap() {
            PlatformEvent::Ready(info) => assert_eq!(info.guild_count, 2),
            other => panic!("unexpected event {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_mock_reply_records_message() {
        let source = MockEventSource::new();
        let message = InboundMessage::new(
            "m1",
            Location::new("c1"),
            Author::new("u1", "alice"),
            "hi",
        );
        source.reply(&message, "Hello!").await.unwrap();

        let sent = source.sent_replies().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel_id, "c1");
        assert_eq!(sent[0].reply_to, "m1");
        assert_eq!(sent[0].content, "Hello!");
    }
}
