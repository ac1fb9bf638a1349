//! Trailing-edge debounce timer.
//!
//! A [`Debouncer`] owns at most one pending timer. Scheduling again inside
//! the window aborts the pending timer and starts a new one, so only the last
//! call of a burst fires. Once a timer elapses its task runs detached: a
//! later `schedule` or `cancel` only ever aborts a sleeping timer, never work
//! that has already started.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Delay used by fields for queued validation.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// An owned trailing debounce timer.
pub struct Debouncer {
    delay: Mutex<Duration>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: Mutex::new(delay),
            pending: Mutex::new(None),
        }
    }

    /// Returns the quiet period.
    pub fn delay(&self) -> Duration {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the quiet period for timers scheduled from now on.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Schedules `task` to run once the quiet period elapses, superseding any
    /// pending timer. A zero delay runs the task without a timer.
    ///
    /// Returns `false` when called outside a tokio runtime; the task is
    /// dropped in that case.
    pub fn schedule<F, Fut>(&self, task: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            log::warn!("debounced task dropped: no tokio runtime");
            return false;
        };

        let delay = self.delay();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = pending.take() {
            previous.abort();
        }

        if delay.is_zero() {
            runtime.spawn(task());
            return true;
        }

        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task());
        });
        *pending = Some(timer);

        true
    }

    /// Aborts the pending timer. Returns `true` if one was still sleeping.
    pub fn cancel(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match pending {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                true
            }
            _ => false,
        }
    }

    /// Returns `true` while a timer is sleeping.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay())
            .field("pending", &self.is_pending())
            .finish()
    }
}
