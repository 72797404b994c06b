//! Execution context threaded through scenario steps.
//!
//! Each virtual user gets its own [`Context`], a plain key/value map that
//! travels with every step invocation. Steps read it, may hand back a
//! replacement, and the walker threads that replacement into the next step.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Key/value state carried between steps, hooks, and scenario executions.
///
/// Cloning is a `HashMap` clone — cheap for the small, flat maps this engine
/// expects (a handful of extracted variables, not megabytes of payload).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(HashMap<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn from_map(map: HashMap<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Overlay `overrides` on top of `self`, overrides winning on key clash.
    ///
    /// Used to compute `options.context ⊕ scenario.context` per the scenario
    /// walker's merge rule.
    pub fn merge(&self, overrides: &Context) -> Context {
        let mut merged = self.0.clone();
        for (k, v) in &overrides.0 {
            merged.insert(k.clone(), v.clone());
        }
        Context(merged)
    }

    /// Return a copy with `user_id` injected, as the executor does before
    /// recording `context-before`.
    pub fn with_user_id(&self, user_id: u64) -> Context {
        let mut ctx = self.clone();
        ctx.set("user_id", user_id);
        ctx
    }
}

impl From<HashMap<String, Value>> for Context {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_prefers_overrides() {
        let mut base = Context::new();
        base.set("a", 1);
        base.set("b", 1);
        let mut overrides = Context::new();
        overrides.set("b", 2);

        let merged = base.merge(&overrides);
        assert_eq!(merged.get("a"), Some(&json!(1)));
        assert_eq!(merged.get("b"), Some(&json!(2)));
    }

    #[test]
    fn with_user_id_does_not_mutate_original() {
        let base = Context::new();
        let tagged = base.with_user_id(7);

        assert_eq!(base.get("user_id"), None);
        assert_eq!(tagged.get("user_id"), Some(&json!(7)));
    }
}
