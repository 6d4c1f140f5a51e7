//! Chat Platform Layer
//!
//! Abstracts the chat platform behind [`EventSource`] so the dispatcher and the
//! trigger engine never touch gateway types.
//!
//! ```text
//! Discord Gateway ──► DiscordClient ──► EventStream<PlatformEvent> ──► EventDispatcher
//!                          ▲                                               │
//!                          └────────────── reply / fetch_user ◄────────────┘
//! ```

pub mod discord;
mod traits;
mod types;

pub use discord::{DiscordClient, DiscordConfig, GuildDirectory};
pub use traits::{EventSource, EventStream};
pub use types::{
    Author, Emoji, InboundMessage, Location, PlatformEvent, ReactionEvent, ReadyInfo,
};

#[cfg(any(test, feature = "test-utils"))]
pub use traits::mock;
