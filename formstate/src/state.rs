use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Lock-protected state shared between clones of a handle.
///
/// Every `update` is one batch: the closure sees and mutates the whole state
/// under a single write lock and the revision counter moves once, so
/// observers never see half of a logical operation.
#[derive(Debug)]
pub(crate) struct State<T> {
    inner: Arc<RwLock<T>>,
    revision: Arc<AtomicU64>,
}

impl<T> State<T> {
    /// Create a new state with the given value
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read the value through a closure
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Update the value using a closure
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut guard);
        self.revision.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Number of updates applied so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            revision: Arc::clone(&self.revision),
        }
    }
}
