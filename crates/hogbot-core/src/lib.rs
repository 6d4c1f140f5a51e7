pub mod platform;
pub mod runtime;
pub mod triggers;

pub use platform::{DiscordClient, EventSource, PlatformEvent};
pub use runtime::{DispatchOutcome, EventDispatcher};
pub use triggers::{ResponseSelector, Trigger, TriggerConfigError, TriggerStore};

/// Default location of the trigger configuration, relative to the working directory
pub const DEFAULT_TRIGGERS_PATH: &str = "config/triggers.json";
