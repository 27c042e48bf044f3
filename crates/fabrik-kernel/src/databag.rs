//! Named metric counters updated by processes during a run.

use std::collections::BTreeMap;

use serde::Serialize;

/// Monotonically increasing named counters.
///
/// Backed by an ordered map so two runs serialize identically and can be
/// compared bit for bit.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataBag {
    counters: BTreeMap<String, u64>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `key` exists (at zero) so reports are stable across runs that
    /// never touch it.
    pub fn declare(&mut self, key: &str) {
        self.counters.entry(key.to_string()).or_insert(0);
    }

    /// Add `delta` to `key`, creating it if needed.
    pub fn add(&mut self, key: &str, delta: u64) {
        *self.counters.entry(key.to_string()).or_insert(0) += delta;
    }

    /// Current value of `key`; zero when never written.
    pub fn get(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counters.iter().map(|(key, &value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_monotonically() {
        let mut bag = DataBag::new();
        bag.add("shipped", 4);
        bag.add("shipped", 3);

        assert_eq!(bag.get("shipped"), 7);
        assert_eq!(bag.get("untouched"), 0);
    }

    #[test]
    fn declared_keys_appear_at_zero() {
        let mut bag = DataBag::new();
        bag.declare("delays");
        bag.add("delays", 0);

        assert_eq!(bag.len(), 1);
        assert_eq!(bag.iter().collect::<Vec<_>>(), vec![("delays", 0)]);
    }

    #[test]
    fn serializes_with_stable_key_order() {
        let mut bag = DataBag::new();
        bag.add("b", 2);
        bag.add("a", 1);

        let json = serde_json::to_string(&bag).expect("serialize");
        assert_eq!(json, r#"{"a":1,"b":2}"#);
    }
}
