//! Layered variable scopes.
//!
//! A [`LayeredMap`] is an ordered stack of key/value layers read as one
//! mapping. Later layers are more specific scopes (host over group over
//! defaults) and win on lookup. With [`MergePolicy::Merge`], nested mappings
//! found under the same key in several layers are deep-merged instead.
//!
//! The map is single-threaded: layers are shared through `Rc<RefCell<_>>`
//! handles, so it is neither `Send` nor `Sync`. Wrap it in your own
//! synchronization if several threads need it.

mod chain;
mod error;
mod layer;
mod merge;
mod policy;

pub use chain::LayeredMap;
pub use error::{ChainError, Result};
pub use layer::{layer_from_value, shared, Layer, SharedLayer};
pub use merge::{deep_merge, merge_layers};
pub use policy::MergePolicy;
