//! Substring Triggers
//!
//! Configuration-driven auto-replies. A trigger pairs a text fragment (scoped to
//! a set of channels, optionally case sensitive) with a list of candidate replies.
//!
//! ```text
//! triggers.json ──► TriggerStore ──► find_matching_trigger() ──► ResponseSelector
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use hogbot_core::triggers::{ResponseSelector, TriggerStore};
//!
//! let store = TriggerStore::load("config/triggers.json")?;
//! let selector = ResponseSelector::new();
//!
//! if let Some(trigger) = store.find_matching_trigger("hi everyone", "123") {
//!     let reply = selector.select(trigger);
//! }
//! ```

mod error;
mod matcher;
mod selector;
mod store;

pub use error::TriggerConfigError;
pub use selector::{ResponseSelector, get_random_response};
pub use store::{TriggerStore, TriggersFile};

use serde::{Deserialize, Serialize};

/// Discord's hard limit for a single message body.
pub const MAX_RESPONSE_LEN: usize = 2000;

/// A configured auto-reply rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    /// Identifier used in logs
    pub id: String,
    /// Disabled triggers never match
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Channels this trigger is restricted to (empty = all channels)
    #[serde(default)]
    pub channel_ids: Vec<String>,
    /// Fragment searched for in message content
    pub substring: String,
    /// Compare without lower-casing when true
    #[serde(default)]
    pub case_sensitive: bool,
    /// Candidate replies, one is picked at random
    pub responses: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Trigger {
    /// Create an enabled, unscoped, case-insensitive trigger
    pub fn new(
        id: impl Into<String>,
        substring: impl Into<String>,
        responses: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            channel_ids: Vec::new(),
            substring: substring.into(),
            case_sensitive: false,
            responses: responses.into_iter().map(Into::into).collect(),
        }
    }

    /// Restrict to the given channels
    pub fn with_channels(mut self, channel_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.channel_ids = channel_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set case sensitivity
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether this trigger may fire in `channel_id`
    pub fn applies_to_channel(&self, channel_id: &str) -> bool {
        self.channel_ids.is_empty() || self.channel_ids.iter().any(|id| id == channel_id)
    }
}
