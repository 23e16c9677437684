use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use crate::identity::Identity;
use crate::row::Row;
use crate::value::Value;

/// Shared handle to a mapped entity.
///
/// Mappers hand out entities behind `Arc<RwLock<..>>` so that the identity
/// map can guarantee a single live instance per identity while holding only
/// a weak reference to it.
pub type Shared<E> = Arc<RwLock<E>>;

/// Wrap a freshly constructed entity in a [`Shared`] handle.
pub fn shared<E>(entity: E) -> Shared<E> {
    Arc::new(RwLock::new(entity))
}

/// Per-instance mapping lifecycle state.
///
/// Invariants:
/// - an entity is *persisted* iff it holds an identity, *transient*
///   otherwise;
/// - an entity is *clean* iff its touched-field set is empty;
/// - hydration from storage never touches fields, mutators always do.
#[derive(Clone, Debug, Default)]
pub struct MappingState {
    identity: Option<Identity>,
    touched: BTreeSet<String>,
    store: Option<String>,
}

impl MappingState {
    /// Create a transient, clean state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Not mapped to any row (yet).
    pub fn is_transient(&self) -> bool {
        self.identity.is_none()
    }

    /// Modified since the last clean mark.
    pub fn is_dirty(&self) -> bool {
        !self.touched.is_empty()
    }

    /// No field touched since the last clean mark.
    pub fn is_clean(&self) -> bool {
        self.touched.is_empty()
    }

    /// The identity assigned by storage, if persisted.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Mark the entity persisted under the given identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Drop the identity, returning the entity to transient.
    pub fn detach(&mut self) {
        self.identity = None;
    }

    /// Record that a field was explicitly set.
    pub fn touch(&mut self, field: &str) {
        self.touched.insert(field.to_string());
    }

    /// Was the field set since the last clean mark?
    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    /// Touched field names, sorted.
    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }

    /// Clear the whole touched set.
    pub fn set_clean(&mut self) {
        self.touched.clear();
    }

    /// Clear only the given fields from the touched set.
    ///
    /// A save clears exactly the fields it submitted to storage; anything
    /// touched concurrently stays dirty.
    pub fn clear_touched<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        for field in fields {
            self.touched.remove(field);
        }
    }

    /// Diagnostics label naming the physical store that produced the
    /// entity, when known (e.g. a write-ahead tier).
    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    /// Set the diagnostics store label.
    pub fn set_store(&mut self, label: impl Into<String>) {
        self.store = Some(label.into());
    }
}

/// Contract between a mapped domain type and its mapper.
///
/// Implementations own their field storage; the mapper only ever reads and
/// writes fields by name through this trait. Two rules matter:
///
/// - `set_field` must mark the field touched in the mapping state, so the
///   mapper can extract minimal writes;
/// - `hydrate` constructs from a row without validation and without
///   touching anything -- storage data is trusted.
pub trait Entity: Send + Sync + Sized + 'static {
    /// Read a scalar field by name. `None` means the field is unknown to
    /// this type, not that it is null.
    fn field(&self, name: &str) -> Option<Value>;

    /// Write a scalar field by name, marking it touched. Unknown names are
    /// ignored.
    fn set_field(&mut self, name: &str, value: Value);

    /// Construct from a storage row, trusting its data. The result is
    /// transient and clean until the mapper assigns identity.
    fn hydrate(row: &Row) -> Self;

    /// The mapping lifecycle state.
    fn state(&self) -> &MappingState;

    /// Mutable mapping lifecycle state.
    fn state_mut(&mut self) -> &mut MappingState;
}
