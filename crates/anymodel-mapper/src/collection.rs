use anymodel_types::{shared, Shared};

use crate::error::MapResult;

/// Loader callback backing an unresolved [`Collection`].
pub type Loader<T> = Box<dyn Fn() -> MapResult<Vec<Shared<T>>> + Send + Sync>;

/// A lazy sequence of related entities.
///
/// Explicitly a tagged variant: either an unresolved loader or a resolved
/// ordered sequence, never both. Any element access or length query
/// resolves exactly once; on success the loader is discarded and the
/// collection behaves as a fixed sequence for the rest of its life (a
/// memoizing thunk, not a refreshing view). On a load error the collection
/// stays unresolved, so the access can be retried.
pub enum Collection<T> {
    /// Not loaded yet; holds the loader and no data.
    Unresolved(Loader<T>),
    /// Loaded (or constructed from known data); the loader is gone.
    Resolved(Vec<Shared<T>>),
}

impl<T> Collection<T> {
    /// A collection that resolves through the given loader on first access.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> MapResult<Vec<Shared<T>>> + Send + Sync + 'static,
    {
        Collection::Unresolved(Box::new(loader))
    }

    /// An already-materialized collection; skips the unresolved state.
    pub fn from_entities(items: impl IntoIterator<Item = T>) -> Self {
        Collection::Resolved(items.into_iter().map(shared).collect())
    }

    /// Returns `true` once the loader has run (or never existed).
    pub fn is_resolved(&self) -> bool {
        matches!(self, Collection::Resolved(_))
    }

    fn resolve(&mut self) -> MapResult<()> {
        let items = match self {
            Collection::Resolved(_) => return Ok(()),
            Collection::Unresolved(loader) => loader()?,
        };
        *self = Collection::Resolved(items);
        Ok(())
    }

    /// The resolved items, loading them on first call.
    pub fn items(&mut self) -> MapResult<&[Shared<T>]> {
        self.resolve()?;
        match self {
            Collection::Resolved(items) => Ok(items.as_slice()),
            Collection::Unresolved(_) => unreachable!("resolve leaves the collection resolved"),
        }
    }

    /// Number of related entities, loading on first call.
    pub fn len(&mut self) -> MapResult<usize> {
        Ok(self.items()?.len())
    }

    /// Returns `true` if there are no related entities, loading on first
    /// call.
    pub fn is_empty(&mut self) -> MapResult<bool> {
        Ok(self.items()?.is_empty())
    }

    /// Indexed access, loading on first call.
    pub fn get(&mut self, index: usize) -> MapResult<Option<Shared<T>>> {
        Ok(self.items()?.get(index).cloned())
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection::Resolved(Vec::new())
    }
}

impl<T> From<Vec<Shared<T>>> for Collection<T> {
    fn from(items: Vec<Shared<T>>) -> Self {
        Collection::Resolved(items)
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Unresolved(_) => f.write_str("Collection(...)"),
            Collection::Resolved(items) => write!(f, "Collection({} items)", items.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn from_entities_is_resolved_immediately() {
        let mut collection = Collection::from_entities(vec!["a", "b"]);
        assert!(collection.is_resolved());
        assert_eq!(collection.len().unwrap(), 2);
    }

    #[test]
    fn loader_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut collection: Collection<&str> = Collection::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![shared("flight")])
        });

        assert!(!collection.is_resolved());
        assert_eq!(collection.len().unwrap(), 1);
        assert!(collection.is_resolved());
        assert!(collection.get(0).unwrap().is_some());
        assert!(collection.get(1).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_stays_unresolved_and_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut collection: Collection<&str> = Collection::lazy(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(MapError::TransientEntity)
            } else {
                Ok(vec![shared("flight")])
            }
        });

        assert!(collection.items().is_err());
        assert!(!collection.is_resolved());

        assert_eq!(collection.len().unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn default_is_empty_and_resolved() {
        let mut collection: Collection<&str> = Collection::default();
        assert!(collection.is_resolved());
        assert!(collection.is_empty().unwrap());
    }
}
