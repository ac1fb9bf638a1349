use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::ValidatorFault;

/// What a validator hands back for one value.
///
/// `None` and `Some("")` both mean the value passed.
pub enum Check {
    /// Answered synchronously.
    Ready(Option<String>),
    /// Answer arrives later; a fault aborts the pipeline.
    Pending(BoxFuture<'static, Result<Option<String>, ValidatorFault>>),
}

impl Check {
    /// A passing check.
    pub fn pass() -> Self {
        Self::Ready(None)
    }

    /// A failing check with the given message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Ready(Some(message.into()))
    }
}

impl From<Option<String>> for Check {
    fn from(message: Option<String>) -> Self {
        Self::Ready(message)
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(message) => f.debug_tuple("Ready").field(message).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A single validation rule over values of type `V`.
///
/// Cheap to clone; clones share the underlying closure.
pub struct Validator<V> {
    check: Arc<dyn Fn(&V) -> Check + Send + Sync>,
}

impl<V: 'static> Validator<V> {
    /// Create a synchronous validator.
    ///
    /// The closure returns the failure message, or `None` when the value passes.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&V) -> Option<String> + Send + Sync + 'static,
    {
        Self::from_check(move |value| Check::Ready(f(value)))
    }

    /// Create a validator from a closure producing a [`Check`] directly.
    pub fn from_check<F>(f: F) -> Self
    where
        F: Fn(&V) -> Check + Send + Sync + 'static,
    {
        Self { check: Arc::new(f) }
    }

    /// Create an asynchronous validator that cannot fault.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        V: Clone,
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        Self::from_check(move |value: &V| {
            let pending = f(value.clone());
            Check::Pending(Box::pin(async move { Ok(pending.await) }))
        })
    }

    /// Create an asynchronous validator that may fault.
    pub fn try_async<F, Fut>(f: F) -> Self
    where
        V: Clone,
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, ValidatorFault>> + Send + 'static,
    {
        Self::from_check(move |value: &V| Check::Pending(Box::pin(f(value.clone()))))
    }
}

impl<V> Validator<V> {
    /// Run the rule against a value.
    pub fn check(&self, value: &V) -> Check {
        (self.check)(value)
    }
}

impl<V> Clone for Validator<V> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
        }
    }
}

impl<V> fmt::Debug for Validator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}
