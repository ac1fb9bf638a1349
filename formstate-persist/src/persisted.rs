//! Debounced persistence for a form.

use std::fmt;
use std::sync::Arc;

use formstate::debounce::Debouncer;
use formstate::{Field, FieldValue, Form, FormMode};
use serde_json::Value;

use crate::config::PersistConfig;
use crate::error::PersistError;
use crate::store::KeyValueStore;

/// Seeds `form` from the values stored under `config.key` and returns a
/// handle that saves the form back after every change.
///
/// Children without a stored value, or with a stored `null`, keep their
/// constructed values. A stored value that is not valid JSON is ignored, as
/// is a child value the child cannot take.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use formstate::{Field, Form};
/// use formstate_persist::{InMemoryStore, KeyValueStore, PersistConfig, persist};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), formstate_persist::PersistError> {
/// let store = Arc::new(InMemoryStore::new());
/// store.set("signup", r#"{"name":"Ada"}"#).await?;
///
/// let form = Form::keyed([("name", Field::new(String::new()))]);
/// let persisted = persist(form, store, PersistConfig::new("signup")).await?;
///
/// assert_eq!(persisted.form().field::<String>("name")?.value(), "Ada");
/// # Ok(())
/// # }
/// ```
pub async fn persist(
    form: Form,
    store: Arc<dyn KeyValueStore>,
    config: PersistConfig,
) -> Result<PersistedForm, PersistError> {
    match store.get(&config.key).await? {
        Some(text) => match serde_json::from_str::<Value>(&text) {
            Ok(stored) => seed(&form, &stored),
            Err(err) => log::warn!("ignoring unreadable values stored under '{}': {}", config.key, err),
        },
        None => log::debug!("nothing stored under '{}'", config.key),
    }

    Ok(PersistedForm {
        inner: Arc::new(PersistedInner {
            form,
            store,
            saver: Debouncer::new(config.delay),
            key: config.key,
        }),
    })
}

fn seed(form: &Form, stored: &Value) {
    for (index, (key, child)) in form.children().enumerate() {
        let value = match form.mode() {
            FormMode::Keyed => stored.get(key),
            FormMode::List => stored.get(index),
        };

        let Some(value) = value.filter(|value| !value.is_null()) else {
            continue;
        };

        if let Err(err) = child.change(value.clone()) {
            log::warn!("stored value for '{}' not applied: {}", key, err);
        }
    }
}

struct PersistedInner {
    form: Form,
    store: Arc<dyn KeyValueStore>,
    key: String,
    saver: Debouncer,
}

/// A form whose values are saved to a store after each change.
///
/// Changes must go through this handle (or a [`PersistedField`] from it) to
/// be saved. Clones share the same pending save.
#[derive(Clone)]
pub struct PersistedForm {
    inner: Arc<PersistedInner>,
}

impl PersistedForm {
    /// The wrapped form.
    pub fn form(&self) -> &Form {
        &self.inner.form
    }

    /// The store key values are saved under.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Apply change events to the named children, then schedule a save.
    pub fn change(&self, values: Value) -> Result<(), PersistError> {
        self.inner.form.change_with(values)?;
        self.schedule_save();
        Ok(())
    }

    /// Reset the form to its construction values, then schedule a save.
    pub fn reset(&self) {
        self.inner.form.reset();
        self.schedule_save();
    }

    /// Reset the named children to the given values, then schedule a save.
    pub fn reset_with(&self, values: Value) -> Result<(), PersistError> {
        self.inner.form.reset_with(values)?;
        self.schedule_save();
        Ok(())
    }

    /// A saving handle to the field stored under `key`.
    pub fn field<V: FieldValue>(&self, key: &str) -> Result<PersistedField<V>, PersistError> {
        Ok(PersistedField {
            field: self.inner.form.field(key)?,
            form: self.clone(),
        })
    }

    /// Save now, dropping any pending debounced save.
    pub async fn flush(&self) -> Result<(), PersistError> {
        self.inner.saver.cancel();
        self.save().await
    }

    /// Returns `true` while a debounced save is waiting.
    pub fn is_save_pending(&self) -> bool {
        self.inner.saver.is_pending()
    }

    fn schedule_save(&self) {
        let this = self.clone();
        self.inner.saver.schedule(move || async move {
            if let Err(err) = this.save().await {
                log::error!("saving form values under '{}' failed: {}", this.key(), err);
            }
        });
    }

    async fn save(&self) -> Result<(), PersistError> {
        let values = self.inner.form.values()?;
        let text = serde_json::to_string(&values)?;
        self.inner.store.set(&self.inner.key, &text).await?;

        log::debug!("saved form values under '{}'", self.inner.key);
        Ok(())
    }
}

impl fmt::Debug for PersistedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedForm")
            .field("key", &self.inner.key)
            .field("form", &self.inner.form)
            .field("save_pending", &self.is_save_pending())
            .finish()
    }
}

/// A field of a [`PersistedForm`] whose changes schedule a save.
pub struct PersistedField<V> {
    field: Field<V>,
    form: PersistedForm,
}

impl<V: FieldValue> PersistedField<V> {
    /// The wrapped field.
    pub fn field(&self) -> &Field<V> {
        &self.field
    }

    /// Record a new value, then schedule a save.
    pub fn on_change(&self, value: V) {
        self.field.on_change(value);
        self.form.schedule_save();
    }

    /// Reset the field, then schedule a save.
    pub fn reset(&self) {
        self.field.reset();
        self.form.schedule_save();
    }

    /// Reset the field to `value` as its new baseline, then schedule a save.
    pub fn reset_to(&self, value: V) {
        self.field.reset_to(value);
        self.form.schedule_save();
    }
}

impl<V> Clone for PersistedField<V> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            form: self.form.clone(),
        }
    }
}
