//! Persistence for formstate forms.
//!
//! [`persist`] seeds a [`Form`](formstate::Form) from a key-value store and
//! wraps it in a [`PersistedForm`] that writes the form's values back after
//! every change, debounced.

pub mod config;
pub mod error;
pub mod persisted;
pub mod store;

pub use config::{DEFAULT_SAVE_DELAY, PersistConfig};
pub use error::PersistError;
pub use persisted::{PersistedField, PersistedForm, persist};
pub use store::{InMemoryStore, KeyValueStore, SqliteStore};
