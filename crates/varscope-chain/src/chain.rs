//! The layered variable map.
//!
//! Layer 0 is the base layer, created empty and never popped. Later layers
//! are more specific scopes and take precedence on lookup.
//!
//! Cloning a `LayeredMap` copies the stack, not the layers: both copies hold
//! handles to the same layer objects. A write into a shared layer through
//! either copy is visible through both, while a push or pop on one copy
//! leaves the other's stack untouched.

use serde_json::{Map, Value};
use std::collections::{btree_set, BTreeSet};
use std::fmt;
use std::rc::Rc;

use crate::error::{ChainError, Result};
use crate::layer::{layer_from_value, shared, Layer, SharedLayer};
use crate::merge::merge_layers;
use crate::policy::MergePolicy;

/// An ordered stack of mapping layers read as one mapping.
#[derive(Clone)]
pub struct LayeredMap {
    layers: Vec<SharedLayer>,
    policy: MergePolicy,
}

impl Default for LayeredMap {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredMap {
    /// Create a map with a single empty base layer and override lookups.
    pub fn new() -> Self {
        Self::with_policy(MergePolicy::default())
    }

    /// Create a map with a single empty base layer and the given policy.
    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            layers: vec![shared(Map::new())],
            policy,
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Change the policy used by subsequent [`get`](Self::get) and
    /// [`to_dict`](Self::to_dict) calls.
    pub fn set_policy(&mut self, policy: MergePolicy) {
        self.policy = policy;
    }

    /// Number of layers, including the base layer.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Layer handles, base layer first.
    pub fn layers(&self) -> &[SharedLayer] {
        &self.layers
    }

    /// Handle to the base layer.
    pub fn base(&self) -> SharedLayer {
        Rc::clone(&self.layers[0])
    }

    /// Handle to the highest-precedence layer.
    pub fn top(&self) -> SharedLayer {
        Rc::clone(&self.layers[self.layers.len() - 1])
    }

    /// Look up a key using the map's policy.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.get_with(key, self.policy)
    }

    /// Look up a key using an explicit policy.
    ///
    /// Under [`MergePolicy::Override`] the value from the highest layer holding
    /// the key is returned. Under [`MergePolicy::Merge`] layers are scanned from
    /// the base upward: a mapping value is deep-merged into an accumulated
    /// mapping, any other value replaces the accumulator outright.
    pub fn get_with(&self, key: &str, policy: MergePolicy) -> Result<Value> {
        let found = match policy {
            MergePolicy::Override => self
                .layers
                .iter()
                .rev()
                .find_map(|layer| layer.borrow().get(key).cloned()),
            MergePolicy::Merge => {
                let values: Vec<Value> = self
                    .layers
                    .iter()
                    .filter_map(|layer| layer.borrow().get(key).cloned())
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(merge_layers(values))
                }
            }
        };
        found.ok_or_else(|| ChainError::KeyNotFound(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.layers.iter().any(|layer| layer.borrow().contains_key(key))
    }

    /// Write a value where an override lookup will find it.
    ///
    /// The highest layer already holding the key is overwritten and no other
    /// layer is touched. A key held by no layer goes into the base layer.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        for (index, layer) in self.layers.iter().enumerate().rev() {
            let mut layer = layer.borrow_mut();
            if layer.contains_key(&key) {
                tracing::trace!(key = %key, layer = index, "overwriting variable");
                layer.insert(key, value);
                return;
            }
        }
        tracing::trace!(key = %key, "setting variable in base layer");
        self.layers[0].borrow_mut().insert(key, value);
    }

    /// Remove a key from every layer holding it.
    ///
    /// Returns the number of layers the key was removed from.
    pub fn delete(&mut self, key: &str) -> usize {
        let removed = self
            .layers
            .iter()
            .filter(|layer| layer.borrow_mut().remove(key).is_some())
            .count();
        tracing::trace!(key, removed, "deleted variable");
        removed
    }

    /// The union of keys across all layers.
    pub fn keys(&self) -> BTreeSet<String> {
        self.layers
            .iter()
            .flat_map(|layer| layer.borrow().keys())
            .collect()
    }

    /// Number of distinct keys across all layers.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.borrow().is_empty())
    }

    /// Iterate the key union, each key once, in sorted order.
    pub fn iter(&self) -> btree_set::IntoIter<String> {
        self.keys().into_iter()
    }

    /// Push a new highest-precedence layer, returning its handle.
    pub fn push<L: Layer + 'static>(&mut self, layer: L) -> SharedLayer {
        let handle = shared(layer);
        self.push_shared(Rc::clone(&handle));
        handle
    }

    /// Push an existing layer handle without copying its contents.
    pub fn push_shared(&mut self, layer: SharedLayer) {
        self.layers.push(layer);
        tracing::trace!(depth = self.layers.len(), "pushed layer");
    }

    /// Push a dynamically-typed value as a new layer.
    ///
    /// This adds a whole layer; it does not merge keys into the top layer.
    /// Fails with [`ChainError::TypeMismatch`] unless `value` is an object.
    pub fn update(&mut self, value: Value) -> Result<SharedLayer> {
        let handle = layer_from_value(value)?;
        self.push_shared(Rc::clone(&handle));
        Ok(handle)
    }

    /// Remove and return the highest-precedence layer.
    ///
    /// The base layer is never removed: with one layer left this fails with
    /// [`ChainError::EmptyStack`] and the map is unchanged.
    pub fn pop(&mut self) -> Result<SharedLayer> {
        if self.layers.len() <= 1 {
            tracing::debug!("refusing to pop the base layer");
            return Err(ChainError::EmptyStack);
        }
        let layer = self.layers.pop().ok_or(ChainError::EmptyStack)?;
        tracing::trace!(depth = self.layers.len(), "popped layer");
        Ok(layer)
    }

    /// Shallow copy: a new stack holding the same layer handles.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Materialize the composed view using the map's policy.
    pub fn to_dict(&self) -> Map<String, Value> {
        self.to_dict_with(self.policy)
    }

    /// Materialize the composed view using an explicit policy.
    pub fn to_dict_with(&self, policy: MergePolicy) -> Map<String, Value> {
        self.iter()
            .filter_map(|key| {
                let value = self.get_with(&key, policy).ok()?;
                Some((key, value))
            })
            .collect()
    }

    /// The composed view as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_dict())
    }
}

impl<'a> IntoIterator for &'a LayeredMap {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for LayeredMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Debug for LayeredMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers: Vec<BTreeSet<String>> = self
            .layers
            .iter()
            .map(|layer| layer.borrow().keys().into_iter().collect())
            .collect();
        f.debug_struct("LayeredMap")
            .field("policy", &self.policy)
            .field("layers", &layers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn layer_keys(layer: &SharedLayer) -> Vec<String> {
        let mut keys = layer.borrow().keys();
        keys.sort();
        keys
    }

    #[test]
    fn test_new_has_one_empty_base_layer() {
        let map = LayeredMap::new();
        assert_eq!(map.depth(), 1);
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.policy(), MergePolicy::Override);
    }

    #[test]
    fn test_get_missing_key() {
        let map = LayeredMap::new();
        assert_eq!(
            map.get("nope"),
            Err(ChainError::KeyNotFound("nope".to_string()))
        );
        assert_eq!(
            map.get_with("nope", MergePolicy::Merge),
            Err(ChainError::KeyNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_override_nested_mapping_topmost_wins() {
        let mut map = LayeredMap::new();
        map.set("a", json!({"x": 1}));
        map.push(obj(json!({"a": {"y": 2}})));

        assert_eq!(map.get("a").unwrap(), json!({"y": 2}));
    }

    #[test]
    fn test_merge_nested_mappings_combine() {
        let mut map = LayeredMap::with_policy(MergePolicy::Merge);
        map.set("a", json!({"x": 1}));
        map.push(obj(json!({"a": {"y": 2}})));

        assert_eq!(map.get("a").unwrap(), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_merge_applies_bottom_layer_first() {
        let mut map = LayeredMap::with_policy(MergePolicy::Merge);
        map.set("svc", json!({"port": 80, "tls": {"enabled": false}}));
        map.push(obj(json!({"svc": {"tls": {"enabled": true, "cert": "a.pem"}}})));
        map.push(obj(json!({"svc": {"port": 8443}})));

        assert_eq!(
            map.get("svc").unwrap(),
            json!({"port": 8443, "tls": {"enabled": true, "cert": "a.pem"}})
        );
    }

    #[test]
    fn test_merge_scalar_topmost_wins() {
        let mut map = LayeredMap::with_policy(MergePolicy::Merge);
        map.set("port", json!(22));
        map.push(obj(json!({"port": 2222})));
        assert_eq!(map.get("port").unwrap(), json!(2222));
    }

    #[test]
    fn test_merge_non_mapping_resets_accumulator() {
        let mut map = LayeredMap::with_policy(MergePolicy::Merge);
        map.set("k", json!({"a": 1}));
        map.push(obj(json!({"k": "flat"})));
        map.push(obj(json!({"k": {"b": 2}})));

        // The string in the middle layer discards {"a": 1}.
        assert_eq!(map.get("k").unwrap(), json!({"b": 2}));
    }

    #[test]
    fn test_merge_does_not_mutate_layers() {
        let mut map = LayeredMap::with_policy(MergePolicy::Merge);
        map.set("a", json!({"x": 1}));
        let top = map.push(obj(json!({"a": {"y": 2}})));

        let _ = map.get("a").unwrap();
        assert_eq!(map.base().borrow().get("a"), Some(&json!({"x": 1})));
        assert_eq!(top.borrow().get("a"), Some(&json!({"y": 2})));
    }

    #[test]
    fn test_get_with_overrides_map_policy() {
        let mut map = LayeredMap::new();
        map.set("a", json!({"x": 1}));
        map.push(obj(json!({"a": {"y": 2}})));

        assert_eq!(
            map.get_with("a", MergePolicy::Merge).unwrap(),
            json!({"x": 1, "y": 2})
        );
        assert_eq!(map.get("a").unwrap(), json!({"y": 2}));

        map.set_policy(MergePolicy::Merge);
        assert_eq!(map.get("a").unwrap(), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_set_overwrites_highest_holder_only() {
        let mut map = LayeredMap::new();
        map.push(obj(json!({"b": 5})));
        map.set("b", json!(9));

        assert_eq!(map.top().borrow().get("b"), Some(&json!(9)));
        assert!(map.base().borrow().is_empty());
    }

    #[test]
    fn test_set_leaves_lower_holders_unchanged() {
        let mut map = LayeredMap::new();
        map.set("v", json!("base"));
        let middle = map.push(obj(json!({"v": "middle"})));
        map.push(obj(json!({"other": 1})));

        map.set("v", json!("new"));

        assert_eq!(middle.borrow().get("v"), Some(&json!("new")));
        assert_eq!(map.base().borrow().get("v"), Some(&json!("base")));
        assert!(!map.top().borrow().contains_key("v"));
        assert_eq!(map.get("v").unwrap(), json!("new"));
    }

    #[test]
    fn test_set_new_key_lands_in_base() {
        let mut map = LayeredMap::new();
        map.push(obj(json!({"a": 1})));
        let before = map.len();

        map.set("fresh", json!(true));

        assert_eq!(map.len(), before + 1);
        assert!(map.base().borrow().contains_key("fresh"));
        assert!(!map.top().borrow().contains_key("fresh"));
    }

    #[test]
    fn test_delete_purges_every_layer() {
        let mut map = LayeredMap::new();
        map.push(obj(json!({"c": 1})));
        map.push(obj(json!({"c": 2})));

        assert_eq!(map.delete("c"), 2);
        for layer in map.layers() {
            assert!(!layer.borrow().contains_key("c"));
        }
        assert!(matches!(map.get("c"), Err(ChainError::KeyNotFound(_))));
        assert!(matches!(
            map.get_with("c", MergePolicy::Merge),
            Err(ChainError::KeyNotFound(_))
        ));
        assert!(!map.keys().contains("c"));
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let mut map = LayeredMap::new();
        map.set("keep", json!(1));
        assert_eq!(map.delete("missing"), 0);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_len_counts_key_union() {
        let mut map = LayeredMap::new();
        map.set("a", json!(1));
        map.push(obj(json!({"a": 2, "b": 3})));
        map.push(obj(json!({"b": 4, "c": 5})));

        assert_eq!(map.len(), 3);
        assert_eq!(
            map.keys().into_iter().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_iteration_yields_each_key_once() {
        let mut map = LayeredMap::new();
        map.set("a", json!(1));
        map.push(obj(json!({"a": 2, "b": 3})));

        let keys: Vec<String> = (&map).into_iter().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut map = LayeredMap::new();
        map.set("a", json!(1));
        let before_keys = map.keys();
        let before_dict = map.to_dict();

        let pushed = map.push(obj(json!({"a": 2, "b": 3})));
        assert_eq!(map.get("a").unwrap(), json!(2));

        let popped = map.pop().unwrap();
        assert!(Rc::ptr_eq(&pushed, &popped));
        assert_eq!(popped.borrow().to_map(), obj(json!({"a": 2, "b": 3})));
        assert_eq!(map.keys(), before_keys);
        assert_eq!(map.to_dict(), before_dict);
    }

    #[test]
    fn test_pop_base_layer_fails() {
        let mut map = LayeredMap::new();
        map.set("a", json!(1));

        assert_eq!(map.pop().err(), Some(ChainError::EmptyStack));
        assert_eq!(map.depth(), 1);
        assert_eq!(map.get("a").unwrap(), json!(1));
    }

    #[test]
    fn test_update_pushes_new_layer() {
        let mut map = LayeredMap::new();
        map.push(obj(json!({"a": 1})));

        map.update(json!({"b": 2})).unwrap();

        assert_eq!(map.depth(), 3);
        assert_eq!(layer_keys(&map.top()), vec!["b"]);
        assert_eq!(map.get("a").unwrap(), json!(1));
    }

    #[test]
    fn test_update_rejects_non_mapping() {
        let mut map = LayeredMap::new();
        assert_eq!(
            map.update(json!(["a", "b"])).err(),
            Some(ChainError::TypeMismatch { found: "array" })
        );
        assert_eq!(map.depth(), 1);
    }

    #[test]
    fn test_push_accepts_other_layer_types() {
        let mut map = LayeredMap::new();
        let mut hosts = std::collections::HashMap::new();
        hosts.insert("ansible_host".to_string(), json!("10.0.0.1"));
        map.push(hosts);

        assert_eq!(map.get("ansible_host").unwrap(), json!("10.0.0.1"));
    }

    #[test]
    fn test_copy_shares_layers() {
        let mut original = LayeredMap::new();
        original.push(obj(json!({"shared": 1})));

        let mut copy = original.copy();
        copy.set("shared", json!(2));
        assert_eq!(original.get("shared").unwrap(), json!(2));

        copy.push(obj(json!({"only_in_copy": true})));
        assert_eq!(original.len(), 1);
        assert!(!original.contains_key("only_in_copy"));
        assert_eq!(copy.len(), 2);

        copy.pop().unwrap();
        copy.pop().unwrap();
        assert_eq!(original.depth(), 2);
    }

    #[test]
    fn test_copy_keeps_policy() {
        let map = LayeredMap::with_policy(MergePolicy::Merge);
        assert_eq!(map.copy().policy(), MergePolicy::Merge);
    }

    #[test]
    fn test_to_dict_follows_policy() {
        let mut map = LayeredMap::new();
        map.set("a", json!({"x": 1}));
        map.set("n", json!(1));
        map.push(obj(json!({"a": {"y": 2}, "n": 2})));

        assert_eq!(
            Value::Object(map.to_dict()),
            json!({"a": {"y": 2}, "n": 2})
        );
        assert_eq!(
            Value::Object(map.to_dict_with(MergePolicy::Merge)),
            json!({"a": {"x": 1, "y": 2}, "n": 2})
        );
    }

    #[test]
    fn test_display_renders_json() {
        let mut map = LayeredMap::new();
        map.set("b", json!(2));
        map.push(obj(json!({"a": "x"})));
        assert_eq!(map.to_string(), r#"{"a":"x","b":2}"#);
    }

    #[test]
    fn test_debug_lists_layer_keys() {
        let mut map = LayeredMap::new();
        map.push(obj(json!({"k": 1})));
        let debug = format!("{:?}", map);
        assert!(debug.contains("Override"));
        assert!(debug.contains("\"k\""));
    }

    #[test]
    fn test_null_value_counts_as_present() {
        let mut map = LayeredMap::new();
        map.set("a", json!(1));
        map.push(obj(json!({"a": null})));
        assert_eq!(map.get("a").unwrap(), Value::Null);
        assert_eq!(map.get_with("a", MergePolicy::Merge).unwrap(), Value::Null);
    }
}
