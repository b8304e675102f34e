//! The mapping capability a layer must provide.
//!
//! Layers are held behind [`SharedLayer`] handles so that a shallow copy of a
//! [`LayeredMap`](crate::LayeredMap) aliases the same layer objects. Writes
//! through one handle are visible through every other handle to that layer.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::error::{kind_of, ChainError, Result};

/// Handle to a layer on the stack.
pub type SharedLayer = Rc<RefCell<dyn Layer>>;

/// A key/value mapping usable as one layer of a [`LayeredMap`](crate::LayeredMap).
pub trait Layer {
    fn contains_key(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<&Value>;

    /// All keys in this layer. Order is implementation-defined.
    fn keys(&self) -> Vec<String>;

    fn insert(&mut self, key: String, value: Value) -> Option<Value>;

    fn remove(&mut self, key: &str) -> Option<Value>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy this layer's contents into a plain JSON object map.
    fn to_map(&self) -> Map<String, Value> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.get(&k).cloned().map(|v| (k, v)))
            .collect()
    }
}

macro_rules! impl_layer_for_map {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Layer for $ty {
                fn contains_key(&self, key: &str) -> bool {
                    <$ty>::contains_key(self, key)
                }

                fn get(&self, key: &str) -> Option<&Value> {
                    <$ty>::get(self, key)
                }

                fn keys(&self) -> Vec<String> {
                    <$ty>::keys(self).cloned().collect()
                }

                fn insert(&mut self, key: String, value: Value) -> Option<Value> {
                    <$ty>::insert(self, key, value)
                }

                fn remove(&mut self, key: &str) -> Option<Value> {
                    <$ty>::remove(self, key)
                }

                fn len(&self) -> usize {
                    <$ty>::len(self)
                }
            }
        )+
    };
}

impl_layer_for_map!(
    Map<String, Value>,
    BTreeMap<String, Value>,
    HashMap<String, Value>,
);

/// Wrap a layer in a shareable handle.
pub fn shared<L: Layer + 'static>(layer: L) -> SharedLayer {
    Rc::new(RefCell::new(layer))
}

/// Turn a dynamically-typed value into a layer.
///
/// Only JSON objects are mappings; anything else is a [`ChainError::TypeMismatch`].
pub fn layer_from_value(value: Value) -> Result<SharedLayer> {
    match value {
        Value::Object(map) => Ok(shared(map)),
        other => Err(ChainError::TypeMismatch {
            found: kind_of(&other),
        }),
    }
}
