//! Single-value validatable field.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::composition::{CompositionParent, Validatable};
use crate::debounce::Debouncer;
use crate::error::{FormError, ValidationError};
use crate::state::State;
use crate::validation::{ValidationResult, Validator, pipeline};

/// Bound for values a field can hold.
///
/// Implemented for every type that is cloneable, comparable and
/// (de)serializable. Serialization backs the JSON projections forms and
/// persistence work with.
pub trait FieldValue: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> FieldValue for T where T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Payload of the `on_did_change` callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<V> {
    pub new_value: V,
    pub old_value: V,
}

type UpdateHandler<V> = Arc<dyn Fn(&Field<V>) + Send + Sync>;
type ChangeHandler<V> = Arc<dyn Fn(&Change<V>) + Send + Sync>;

struct FieldState<V> {
    /// Value the field was constructed with; `reset()` returns here.
    default_value: V,
    init_value: V,
    unsafe_value: V,
    safe_value: V,
    error: Option<String>,
    label: Option<String>,
    has_been_validated: bool,
    /// Validations in flight.
    validating: usize,
    validate_on_blur: bool,
    auto_validation_default: bool,
    auto_validation_enabled: bool,
    /// Bumped by every validate and reset; a validation only applies its
    /// outcome if no later one started meanwhile.
    generation: u64,
    validators: Arc<[Validator<V>]>,
    parent: Option<CompositionParent>,
    on_update: Option<UpdateHandler<V>>,
    on_did_change: Option<ChangeHandler<V>>,
}

struct FieldInner<V> {
    state: State<FieldState<V>>,
    /// One-shot gate set by `reset`, consumed by the next queued wake-up.
    prevent_next_queued_validation: AtomicBool,
    debouncer: Debouncer,
}

/// A single validatable value.
///
/// `Field` is a handle: clones share the same state, so a field can be kept
/// by the caller and handed to a [`Form`](crate::form::Form) at the same time.
///
/// # Example
///
/// ```
/// use formstate::Field;
/// use formstate::validation::rules;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let name = Field::new(String::new()).validators([rules::required("Name is required")]);
///
/// name.on_change("Ada".to_string());
/// let result = name.validate().await.unwrap();
///
/// assert!(result.is_valid());
/// assert_eq!(name.safe_value(), "Ada");
/// # }
/// ```
pub struct Field<V> {
    inner: Arc<FieldInner<V>>,
}

impl<V: FieldValue> Field<V> {
    /// Create a field with the given initial value.
    pub fn new(value: V) -> Self {
        let state = FieldState {
            default_value: value.clone(),
            init_value: value.clone(),
            unsafe_value: value.clone(),
            safe_value: value,
            error: None,
            label: None,
            has_been_validated: false,
            validating: 0,
            validate_on_blur: true,
            auto_validation_default: false,
            auto_validation_enabled: false,
            generation: 0,
            validators: Arc::from(Vec::new()),
            parent: None,
            on_update: None,
            on_did_change: None,
        };

        Self {
            inner: Arc::new(FieldInner {
                state: State::new(state),
                prevent_next_queued_validation: AtomicBool::new(false),
                debouncer: Debouncer::default(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Replace the validator list.
    pub fn validators<I>(self, validators: I) -> Self
    where
        I: IntoIterator<Item = Validator<V>>,
    {
        let validators: Arc<[Validator<V>]> = validators.into_iter().collect();
        self.inner.state.update(|s| s.validators = validators);
        self
    }

    /// Remove every validator.
    pub fn clear_validators(self) -> Self {
        self.validators([])
    }

    /// Set a display label.
    pub fn label(self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.inner.state.update(|s| s.label = Some(label));
        self
    }

    /// Set whether `on_blur` validates.
    pub fn validate_on_blur(self, enabled: bool) -> Self {
        self.inner.state.update(|s| s.validate_on_blur = enabled);
        self
    }

    /// Set the auto-validation default, which `reset` restores. Also applies it now.
    pub fn auto_validation_default(self, enabled: bool) -> Self {
        self.inner.state.update(|s| {
            s.auto_validation_default = enabled;
            s.auto_validation_enabled = enabled;
        });
        self
    }

    /// Set the quiet period of queued validation. Zero validates on every change.
    pub fn auto_validation_debounce(self, delay: Duration) -> Self {
        self.inner.debouncer.set_delay(delay);
        self
    }

    /// Register the state-changed callback.
    pub fn on_update<F>(self, handler: F) -> Self
    where
        F: Fn(&Field<V>) + Send + Sync + 'static,
    {
        let handler: UpdateHandler<V> = Arc::new(handler);
        self.inner.state.update(|s| s.on_update = Some(handler));
        self
    }

    /// Register the value-changed callback.
    pub fn on_did_change<F>(self, handler: F) -> Self
    where
        F: Fn(&Change<V>) + Send + Sync + 'static,
    {
        let handler: ChangeHandler<V> = Arc::new(handler);
        self.inner.state.update(|s| s.on_did_change = Some(handler));
        self
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The value as last written by `on_change`.
    pub fn value(&self) -> V {
        self.inner.state.read(|s| s.unsafe_value.clone())
    }

    /// The value as last confirmed by a passing validation.
    pub fn safe_value(&self) -> V {
        self.inner.state.read(|s| s.safe_value.clone())
    }

    /// The baseline for change detection.
    pub fn init_value(&self) -> V {
        self.inner.state.read(|s| s.init_value.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.read(|s| s.error.clone())
    }

    pub fn has_error(&self) -> bool {
        self.inner.state.read(|s| s.error.is_some())
    }

    pub fn label_text(&self) -> Option<String> {
        self.inner.state.read(|s| s.label.clone())
    }

    /// Check if the value differs from its baseline.
    ///
    /// Compares the JSON text of both values with every space removed, so
    /// `"a b"` and `"ab"` count as unchanged.
    /// Values that cannot be serialized fall back to plain equality.
    pub fn is_changed(&self) -> bool {
        self.inner.state.read(|s| {
            match (loose_projection(&s.unsafe_value), loose_projection(&s.init_value)) {
                (Ok(value), Ok(init)) => value != init,
                (value, init) => {
                    if let Err(err) = value.and(init) {
                        log::warn!("change check fell back to equality: {}", err);
                    }
                    s.unsafe_value != s.init_value
                }
            }
        })
    }

    /// Check if the value differs from the construction value.
    pub fn is_dirty(&self) -> bool {
        self.inner.state.read(|s| s.unsafe_value != s.default_value)
    }

    pub fn has_been_validated(&self) -> bool {
        self.inner.state.read(|s| s.has_been_validated)
    }

    pub fn is_validating(&self) -> bool {
        self.inner.state.read(|s| s.validating > 0)
    }

    pub fn is_auto_validation_enabled(&self) -> bool {
        self.inner.state.read(|s| s.auto_validation_enabled)
    }

    pub fn is_validate_on_blur(&self) -> bool {
        self.inner.state.read(|s| s.validate_on_blur)
    }

    /// Number of state updates so far; moves once per logical operation.
    pub fn revision(&self) -> u64 {
        self.inner.state.revision()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Record a new value.
    ///
    /// Notifies `on_did_change` and `on_update`, and queues a debounced
    /// validation when auto-validation is enabled.
    pub fn on_change(&self, value: V) {
        self.inner.prevent_next_queued_validation.store(false, Ordering::SeqCst);

        let (change, auto_validate) = self.inner.state.update(|s| {
            let old_value = std::mem::replace(&mut s.unsafe_value, value.clone());
            (
                Change {
                    new_value: value,
                    old_value,
                },
                s.auto_validation_enabled,
            )
        });

        if let Some(handler) = self.inner.state.read(|s| s.on_did_change.clone()) {
            handler(&change);
        }
        self.notify_update();

        if auto_validate {
            self.queue_validation();
        }
    }

    /// Schedule a validation after the debounce window.
    ///
    /// Calls within the window collapse into one run, which validates the
    /// value present when the timer fires. A `reset` in between skips that
    /// run.
    pub fn queue_validation(&self) {
        let field: Weak<FieldInner<V>> = Arc::downgrade(&self.inner);

        self.inner.debouncer.schedule(move || async move {
            if let Some(inner) = field.upgrade() {
                Field { inner }.queued_validation_wakeup().await;
            }
        });
    }

    async fn queued_validation_wakeup(&self) {
        if self
            .inner
            .prevent_next_queued_validation
            .swap(false, Ordering::SeqCst)
        {
            log::debug!("queued validation skipped after reset");
            return;
        }

        if let Err(err) = self.validate().await {
            log::error!("queued validation failed: {}", err);
        }
    }

    /// Validate the current value with the field's validators.
    pub async fn validate(&self) -> Result<ValidationResult<V>, ValidationError> {
        let validators = self.inner.state.read(|s| Arc::clone(&s.validators));
        self.validate_with(&validators).await
    }

    /// Validate the current value with the given validators instead.
    ///
    /// On pass the error is cleared, the value becomes the safe value and the
    /// parent form is notified; on failure the message becomes the error.
    /// Overlapping calls are resolved by start order: an outcome is only
    /// applied if no validation or reset started after this call did.
    pub async fn validate_with(&self, validators: &[Validator<V>]) -> Result<ValidationResult<V>, ValidationError> {
        let (generation, value) = self.inner.state.update(|s| {
            s.generation += 1;
            s.validating += 1;
            (s.generation, s.unsafe_value.clone())
        });

        let outcome = pipeline::run(&value, validators).await;

        let current = self.inner.state.update(|s| {
            s.validating = s.validating.saturating_sub(1);

            let current = s.generation == generation;
            if let (true, Ok(message)) = (current, &outcome) {
                s.error = message.clone();
                s.has_been_validated = true;
                if message.is_none() {
                    s.safe_value = value.clone();
                }
            }
            current
        });

        if !current {
            log::trace!("stale validation outcome discarded");
        }
        self.notify_update();

        match outcome? {
            Some(message) => Ok(ValidationResult::Invalid(message)),
            None => {
                if current {
                    self.notify_validation_pass().await;
                }
                Ok(ValidationResult::Valid(value))
            }
        }
    }

    /// Turn auto-validation on and validate right away.
    pub async fn enable_auto_validation_and_validate(&self) -> Result<ValidationResult<V>, ValidationError> {
        self.enable_auto_validation();
        self.validate().await
    }

    /// Validate immediately if `validate_on_blur` is set.
    pub async fn on_blur(&self) -> Option<Result<ValidationResult<V>, ValidationError>> {
        if self.is_validate_on_blur() {
            Some(self.validate().await)
        } else {
            None
        }
    }

    /// Reset to the construction value.
    pub fn reset(&self) {
        let value = self.inner.state.read(|s| s.default_value.clone());
        self.reset_to(value);
    }

    /// Reset to `value`, which also becomes the new baseline.
    ///
    /// Clears the error, restores the auto-validation default, skips a
    /// pending queued validation and tells the parent form this field is no
    /// longer validated.
    pub fn reset_to(&self, value: V) {
        self.inner.prevent_next_queued_validation.store(true, Ordering::SeqCst);

        self.inner.state.update(|s| {
            s.auto_validation_enabled = s.auto_validation_default;
            s.init_value = value.clone();
            s.unsafe_value = value.clone();
            s.safe_value = value;
            s.error = None;
            s.has_been_validated = false;
            s.generation += 1;
        });

        if let Some(parent) = self.parent() {
            parent.initialized();
        }
        self.notify_update();
    }

    /// Set or clear the error by hand. An empty message clears it.
    pub fn set_error(&self, error: Option<String>) {
        let error = error.filter(|message| !message.is_empty());
        self.inner.state.update(|s| s.error = error);
        self.notify_update();
    }

    pub fn enable_auto_validation(&self) {
        self.inner.state.update(|s| s.auto_validation_enabled = true);
    }

    pub fn disable_auto_validation(&self) {
        self.inner.state.update(|s| s.auto_validation_enabled = false);
    }

    /// Install the parent form's hooks. A field has at most one parent.
    pub fn set_composition_parent(&self, parent: CompositionParent) -> Result<(), FormError> {
        self.inner.state.update(|s| {
            if s.parent.is_some() {
                return Err(FormError::already_composed());
            }
            s.parent = Some(parent);
            Ok(())
        })
    }

    fn parent(&self) -> Option<CompositionParent> {
        self.inner.state.read(|s| s.parent.clone())
    }

    async fn notify_validation_pass(&self) {
        if let Some(follow_up) = self.parent().and_then(|parent| parent.validation_passed()) {
            follow_up.await;
        }
    }

    fn notify_update(&self) {
        if let Some(handler) = self.inner.state.read(|s| s.on_update.clone()) {
            handler(self);
        }
    }
}

fn loose_projection<V: Serialize>(value: &V) -> Result<String, serde_json::Error> {
    serde_json::to_string(value).map(|text| text.chars().filter(|c| *c != ' ').collect())
}

impl<V> Clone for Field<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: FieldValue + fmt::Debug> fmt::Debug for Field<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.state.read(|s| {
            f.debug_struct("Field")
                .field("value", &s.unsafe_value)
                .field("error", &s.error)
                .field("validating", &(s.validating > 0))
                .finish_non_exhaustive()
        })
    }
}

impl<V: FieldValue> Validatable for Field<V> {
    fn validate_node(&self) -> BoxFuture<'static, Result<bool, ValidationError>> {
        let field = self.clone();
        Box::pin(async move { field.validate().await.map(|result| result.has_error()) })
    }

    fn has_error(&self) -> bool {
        Field::has_error(self)
    }

    fn error(&self) -> Option<String> {
        Field::error(self)
    }

    fn clear_error(&self) {
        self.set_error(None);
    }

    fn is_changed(&self) -> bool {
        Field::is_changed(self)
    }

    fn is_validating(&self) -> bool {
        Field::is_validating(self)
    }

    fn value_json(&self) -> Result<Value, FormError> {
        self.inner
            .state
            .read(|s| serde_json::to_value(&s.unsafe_value))
            .map_err(FormError::invalid_value)
    }

    fn safe_value_json(&self) -> Result<Value, FormError> {
        self.inner
            .state
            .read(|s| serde_json::to_value(&s.safe_value))
            .map_err(FormError::invalid_value)
    }

    fn reset_node(&self) {
        self.reset();
    }

    fn reset_json(&self, value: Value) -> Result<(), FormError> {
        let value = serde_json::from_value(value).map_err(FormError::invalid_value)?;
        self.reset_to(value);
        Ok(())
    }

    fn check_json(&self, value: &Value) -> Result<(), FormError> {
        V::deserialize(value).map(drop).map_err(FormError::invalid_value)
    }

    fn change_json(&self, value: Value) -> Result<(), FormError> {
        let value = serde_json::from_value(value).map_err(FormError::invalid_value)?;
        self.on_change(value);
        Ok(())
    }

    fn set_auto_validation(&self, enabled: bool) {
        if enabled {
            self.enable_auto_validation();
        } else {
            self.disable_auto_validation();
        }
    }

    fn set_composition_parent(&self, parent: CompositionParent) -> Result<(), FormError> {
        Field::set_composition_parent(self, parent)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
