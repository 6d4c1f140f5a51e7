use std::borrow::Cow;

use super::Trigger;
use super::store::TriggerStore;

impl Trigger {
    /// Whether this trigger fires for `content` posted in `channel_id`
    pub fn matches(&self, content: &str, channel_id: &str) -> bool {
        if !self.enabled || !self.applies_to_channel(channel_id) {
            return false;
        }

        let (haystack, needle): (Cow<'_, str>, Cow<'_, str>) = if self.case_sensitive {
            (Cow::Borrowed(content), Cow::Borrowed(self.substring.as_str()))
        } else {
            (
                Cow::Owned(content.to_lowercase()),
                Cow::Owned(self.substring.to_lowercase()),
            )
        };

        haystack.contains(needle.as_ref())
    }
}

impl TriggerStore {
    /// First trigger, in declaration order, that fires for this message.
    pub fn find_matching_trigger(&self, content: &str, channel_id: &str) -> Option<&Trigger> {
        self.triggers()
            .iter()
            .find(|trigger| trigger.matches(content, channel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(triggers: Vec<Trigger>) -> TriggerStore {
        TriggerStore::from_triggers(triggers).unwrap()
    }

    #[test]
    fn test_disabled_trigger_never_matches() {
        let store = store(vec![Trigger::new("off", "hello", ["x"]).with_enabled(false)]);
        assert!(store.find_matching_trigger("hello", "any").is_none());
        assert!(store.find_matching_trigger("HELLO hello", "other").is_none());
    }

    #[test]
    fn test_scoped_trigger_only_matches_listed_channels() {
        let store = store(vec![Trigger::new("scoped", "deploy", ["x"]).with_channels(["c1", "c2"])]);
        assert_eq!(
            store.find_matching_trigger("time to deploy", "c1").map(|t| t.id.as_str()),
            Some("scoped")
        );
        assert!(store.find_matching_trigger("time to deploy", "c2").is_some());
        assert!(store.find_matching_trigger("time to deploy", "c3").is_none());
    }

    #[test]
    fn test_unscoped_trigger_matches_any_channel() {
        let store = store(vec![Trigger::new("any", "deploy", ["x"])]);
        for channel in ["c1", "c2", "dm-42"] {
            assert!(store.find_matching_trigger("deploy now", channel).is_some());
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        let store = store(vec![Trigger::new("hello", "Hello", ["x"])]);
        assert!(store.find_matching_trigger("say HELLO there", "c").is_some());
    }

    #[test]
    fn test_case_sensitive_match() {
        let store = store(vec![Trigger::new("hello", "Hello", ["x"]).with_case_sensitive(true)]);
        assert!(store.find_matching_trigger("say HELLO there", "c").is_none());
        assert!(store.find_matching_trigger("say Hello there", "c").is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let store = store(vec![
            Trigger::new("first", "bug", ["1"]),
            Trigger::new("second", "bug report", ["2"]),
        ]);
        let found = store.find_matching_trigger("filing a bug report", "c").unwrap();
        assert_eq!(found.id, "first");
    }

    #[test]
    fn test_skipped_triggers_fall_through_to_later_ones() {
        let store = store(vec![
            Trigger::new("disabled", "bug", ["1"]).with_enabled(false),
            Trigger::new("elsewhere", "bug", ["2"]).with_channels(["other"]),
            Trigger::new("fallback", "bug", ["3"]),
        ]);
        let found = store.find_matching_trigger("bug", "here").unwrap();
        assert_eq!(found.id, "fallback");
    }

    #[test]
    fn test_no_match_returns_none() {
        let store = store(vec![Trigger::new("greet", "hi", ["x"])]);
        assert!(store.find_matching_trigger("good morning", "c").is_none());
        assert!(store.find_matching_trigger("", "c").is_none());
    }

    #[test]
    fn test_unicode_lowercasing() {
        let store = store(vec![Trigger::new("umlaut", "ÜBER", ["x"])]);
        assert!(store.find_matching_trigger("das ist über cool", "c").is_some());
    }

    #[test]
    fn test_repeated_lookups_are_stable() {
        let store = store(vec![
            Trigger::new("a", "x", ["1"]),
            Trigger::new("b", "x", ["2"]),
        ]);
        for _ in 0..10 {
            assert_eq!(store.find_matching_trigger("xx", "c").unwrap().id, "a");
        }
    }
}
