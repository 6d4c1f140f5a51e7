//! Trigger Store
//!
//! Owns the ordered trigger list for the lifetime of the process. The list is
//! read once, validated, and never mutated afterwards; reloading means building
//! a new store.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::error::TriggerConfigError;
use super::{MAX_RESPONSE_LEN, Trigger};

/// On-disk shape of the trigger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggersFile {
    pub triggers: Vec<Trigger>,
}

/// Immutable, validated trigger list
#[derive(Debug, Clone)]
pub struct TriggerStore {
    triggers: Vec<Trigger>,
}

impl TriggerStore {
    /// Read and validate the trigger file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TriggerConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TriggerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::from_json_str(&raw)?;
        info!(
            "Loaded {} trigger(s) ({} enabled) from {}",
            store.len(),
            store.enabled_count(),
            path.display()
        );
        Ok(store)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(raw: &str) -> Result<Self, TriggerConfigError> {
        let file: TriggersFile = serde_json::from_str(raw)?;
        Self::from_triggers(file.triggers)
    }

    /// Validate an in-memory trigger list, keeping its order
    pub fn from_triggers(triggers: Vec<Trigger>) -> Result<Self, TriggerConfigError> {
        validate(&triggers)?;
        Ok(Self { triggers })
    }

    /// All triggers in declaration order
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Look up a trigger by id
    pub fn get(&self, id: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|trigger| trigger.id == id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.triggers.iter().filter(|trigger| trigger.enabled).count()
    }
}

fn validate(triggers: &[Trigger]) -> Result<(), TriggerConfigError> {
    let mut seen = HashSet::new();

    for trigger in triggers {
        if !seen.insert(trigger.id.as_str()) {
            return Err(TriggerConfigError::DuplicateId(trigger.id.clone()));
        }

        if trigger.substring.is_empty() {
            return Err(TriggerConfigError::EmptySubstring(trigger.id.clone()));
        }

        if trigger.responses.is_empty() {
            return Err(TriggerConfigError::EmptyResponses(trigger.id.clone()));
        }

        for (index, response) in trigger.responses.iter().enumerate() {
            let len = response.chars().count();
            if len > MAX_RESPONSE_LEN {
                return Err(TriggerConfigError::ResponseTooLong {
                    id: trigger.id.clone(),
                    index,
                    len,
                    max: MAX_RESPONSE_LEN,
                });
            }
        }

        debug!(
            "Trigger '{}' ok (enabled={}, channels={})",
            trigger.id,
            trigger.enabled,
            trigger.channel_ids.len()
        );
    }

    Ok(())
}
