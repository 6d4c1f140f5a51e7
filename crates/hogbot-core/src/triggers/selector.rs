//! Response selection for matched triggers.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use super::Trigger;

/// Pick one of `trigger.responses` uniformly at random.
///
/// The store rejects triggers without responses, so the range is never empty
/// for a trigger obtained from it.
pub fn get_random_response<'a, R: RngExt>(trigger: &'a Trigger, rng: &mut R) -> &'a str {
    let index = rng.random_range(0..trigger.responses.len());
    &trigger.responses[index]
}

/// Shared response picker owning its random source
pub struct ResponseSelector {
    rng: Mutex<StdRng>,
}

impl ResponseSelector {
    /// Selector seeded from the thread-local generator
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// Selector with a fixed seed, for reproducible picks
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Choose a reply for `trigger`
    pub fn select<'a>(&self, trigger: &'a Trigger) -> &'a str {
        let mut rng = self.rng.lock();
        get_random_response(trigger, &mut *rng)
    }
}

impl Default for ResponseSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn greet() -> Trigger {
        Trigger::new("greet", "hi", ["Hello!", "Hey there!", "Howdy!"])
    }

    #[test]
    fn test_single_response_always_returned() {
        let trigger = Trigger::new("one", "x", ["only"]);
        let selector = ResponseSelector::new();
        for _ in 0..20 {
            assert_eq!(selector.select(&trigger), "only");
        }
    }

    #[test]
    fn test_selection_is_a_member() {
        let trigger = greet();
        let selector = ResponseSelector::new();
        for _ in 0..100 {
            let picked = selector.select(&trigger);
            assert!(trigger.responses.iter().any(|r| r == picked));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let trigger = greet();
        let a = ResponseSelector::seeded(7);
        let b = ResponseSelector::seeded(7);
        let seq_a: Vec<&str> = (0..32).map(|_| a.select(&trigger)).collect();
        let seq_b: Vec<&str> = (0..32).map(|_| b.select(&trigger)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_free_function_with_injected_rng() {
        let trigger = greet();
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        assert_eq!(
            get_random_response(&trigger, &mut rng_a),
            get_random_response(&trigger, &mut rng_b)
        );
    }

    #[test]
    fn test_roughly_uniform_distribution() {
        let trigger = greet();
        let selector = ResponseSelector::seeded(2024);
        let draws = 6000;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(selector.select(&trigger)).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        let expected = draws / 3;
        for (response, count) in counts {
            assert!(
                count > expected * 8 / 10 && count < expected * 12 / 10,
                "{response} picked {count} times, expected ~{expected}"
            );
        }
    }
}
