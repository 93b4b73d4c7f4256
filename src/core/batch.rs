//! The transition batch: side effects accumulated during one operation.
//!
//! A batch is an explicit value built up by the diff routines and handed
//! back to the caller for flushing, which keeps the diff algorithm
//! testable without a live action sink or variable store. It lives for a
//! single transition or context change and is discarded after the flush.

use std::collections::BTreeMap;

/// Ordered pending action invocations plus pending variable writes.
///
/// Actions preserve emission order exactly. Writes are keyed by variable
/// key with last-write-wins semantics; ordering across distinct keys
/// carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionBatch {
    actions: Vec<String>,
    writes: BTreeMap<String, String>,
}

impl TransitionBatch {
    pub fn new() -> Self {
        TransitionBatch::default()
    }

    /// Queue an action invocation.
    pub fn push_action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    /// Queue a variable write. A later write to the same key replaces
    /// this one.
    pub fn write(&mut self, key: &str, value: impl Into<String>) {
        self.writes.insert(key.to_string(), value.into());
    }

    /// Queue a boolean indicator write.
    pub fn write_flag(&mut self, key: &str, active: bool) {
        self.write(key, if active { "true" } else { "false" });
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn writes(&self) -> &BTreeMap<String, String> {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.writes.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, BTreeMap<String, String>) {
        (self.actions, self.writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_keep_emission_order() {
        let mut batch = TransitionBatch::new();
        batch.push_action("Home");
        batch.push_action("Home|Awake");
        batch.push_action("Home*");
        assert_eq!(batch.actions(), ["Home", "Home|Awake", "Home*"]);
    }

    #[test]
    fn last_write_wins_per_key() {
        let mut batch = TransitionBatch::new();
        batch.write_flag("Home_Awake", true);
        batch.write("Home", "Awake");
        batch.write_flag("Home_Awake", false);
        assert_eq!(batch.writes().get("Home_Awake").unwrap(), "false");
        assert_eq!(batch.writes().len(), 2);
    }

    #[test]
    fn new_batch_is_empty() {
        assert!(TransitionBatch::new().is_empty());
    }

    #[test]
    fn flags_serialize_as_lowercase_bools() {
        let mut batch = TransitionBatch::new();
        batch.write_flag("a", true);
        batch.write_flag("b", false);
        assert_eq!(batch.writes().get("a").unwrap(), "true");
        assert_eq!(batch.writes().get("b").unwrap(), "false");
    }
}
