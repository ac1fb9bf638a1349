//! Composition protocol between a form and its children.
//!
//! A form owns its children as [`Node`]s: either a type-erased field or a
//! nested form. When the form is composed it installs a
//! [`CompositionParent`] on every child. The child calls
//! `on_validation_pass` after each successful validation of its own and
//! `on_init` after each reset. From those two signals alone the form knows
//! when every child has passed since its last reset, and then runs its own
//! form-level validators.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{FormError, ValidationError};
use crate::field::{Field, FieldValue};
use crate::form::Form;

type PassHook = Arc<dyn Fn() -> Option<BoxFuture<'static, ()>> + Send + Sync>;
type InitHook = Arc<dyn Fn() + Send + Sync>;

/// Hooks a parent form installs on a child.
#[derive(Clone)]
pub struct CompositionParent {
    on_validation_pass: PassHook,
    on_init: InitHook,
}

impl CompositionParent {
    /// Creates a parent from its two hooks.
    ///
    /// `on_validation_pass` may hand back a future carrying the validation it
    /// started in response; the child awaits it before its own validation
    /// call returns.
    pub fn new<P, I>(on_validation_pass: P, on_init: I) -> Self
    where
        P: Fn() -> Option<BoxFuture<'static, ()>> + Send + Sync + 'static,
        I: Fn() + Send + Sync + 'static,
    {
        Self {
            on_validation_pass: Arc::new(on_validation_pass),
            on_init: Arc::new(on_init),
        }
    }

    /// Signals that the child passed validation.
    pub fn validation_passed(&self) -> Option<BoxFuture<'static, ()>> {
        (self.on_validation_pass)()
    }

    /// Signals that the child was reset.
    pub fn initialized(&self) {
        (self.on_init)()
    }
}

impl fmt::Debug for CompositionParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionParent").finish_non_exhaustive()
    }
}

/// Type-erased view of a field, as held by a form.
///
/// Values cross this boundary as JSON so a form can hold fields of
/// different value types side by side.
pub trait Validatable: Send + Sync {
    /// Validates with the field's own validators; resolves to `true` on error.
    fn validate_node(&self) -> BoxFuture<'static, Result<bool, ValidationError>>;

    /// Check if the field currently has an error.
    fn has_error(&self) -> bool;

    /// Get the current error message (if any).
    fn error(&self) -> Option<String>;

    /// Clear the error message.
    fn clear_error(&self);

    /// Check if the value differs from its baseline.
    fn is_changed(&self) -> bool;

    /// Check if a validation is in flight.
    fn is_validating(&self) -> bool;

    /// The value as last written by a change.
    fn value_json(&self) -> Result<Value, FormError>;

    /// The value as last confirmed by validation.
    fn safe_value_json(&self) -> Result<Value, FormError>;

    /// Reset to the construction value.
    fn reset_node(&self);

    /// Reset to the given value, which becomes the new baseline.
    fn reset_json(&self, value: Value) -> Result<(), FormError>;

    /// Check that `value` deserializes into the field's type without applying it.
    fn check_json(&self, value: &Value) -> Result<(), FormError>;

    /// Apply a change event with the given value.
    fn change_json(&self, value: Value) -> Result<(), FormError>;

    /// Turn auto-validation on or off.
    fn set_auto_validation(&self, enabled: bool);

    /// Install the parent hooks.
    fn set_composition_parent(&self, parent: CompositionParent) -> Result<(), FormError>;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// A child of a form: a field or a nested form.
pub enum Node {
    Field(Box<dyn Validatable>),
    Form(Form),
}

impl Node {
    /// Validates the node; resolves to `true` if it ended up with an error.
    pub fn validate(&self) -> BoxFuture<'static, Result<bool, ValidationError>> {
        match self {
            Self::Field(field) => field.validate_node(),
            Self::Form(form) => {
                let form = form.clone();
                Box::pin(async move { form.validate().await.map(|result| result.has_error()) })
            }
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            Self::Field(field) => field.has_error(),
            Self::Form(form) => form.has_error(),
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            Self::Field(field) => field.error(),
            Self::Form(form) => form.error(),
        }
    }

    /// Clears field errors, recursively for nested forms.
    pub fn clear_error(&self) {
        match self {
            Self::Field(field) => field.clear_error(),
            Self::Form(form) => form.reset_validation_error(),
        }
    }

    pub fn is_changed(&self) -> bool {
        match self {
            Self::Field(field) => field.is_changed(),
            Self::Form(form) => form.is_changed(),
        }
    }

    pub fn is_validating(&self) -> bool {
        match self {
            Self::Field(field) => field.is_validating(),
            Self::Form(form) => form.is_validating(),
        }
    }

    /// Unsafe value projection.
    pub fn value(&self) -> Result<Value, FormError> {
        match self {
            Self::Field(field) => field.value_json(),
            Self::Form(form) => form.values(),
        }
    }

    /// Safe value projection.
    pub fn safe_value(&self) -> Result<Value, FormError> {
        match self {
            Self::Field(field) => field.safe_value_json(),
            Self::Form(form) => form.safe_values(),
        }
    }

    pub fn reset(&self) {
        match self {
            Self::Field(field) => field.reset_node(),
            Self::Form(form) => form.reset(),
        }
    }

    pub fn reset_to(&self, value: Value) -> Result<(), FormError> {
        match self {
            Self::Field(field) => field.reset_json(value),
            Self::Form(form) => form.reset_with(value),
        }
    }

    /// Checks that `value` could be applied by [`Node::reset_to`] or, with
    /// `skip_nulls`, by [`Node::change`], without touching the node.
    pub fn check(&self, value: &Value, skip_nulls: bool) -> Result<(), FormError> {
        match self {
            Self::Field(field) => field.check_json(value),
            Self::Form(form) => form.check_entries(value, skip_nulls),
        }
    }

    pub fn change(&self, value: Value) -> Result<(), FormError> {
        match self {
            Self::Field(field) => field.change_json(value),
            Self::Form(form) => form.change_with(value),
        }
    }

    pub fn set_auto_validation(&self, enabled: bool) {
        match self {
            Self::Field(field) => field.set_auto_validation(enabled),
            Self::Form(form) if enabled => form.enable_auto_validation(),
            Self::Form(form) => form.disable_auto_validation(),
        }
    }

    pub fn set_composition_parent(&self, parent: CompositionParent) -> Result<(), FormError> {
        match self {
            Self::Field(field) => field.set_composition_parent(parent),
            Self::Form(form) => form.set_composition_parent(parent),
        }
    }

    /// Returns a typed handle if this node is a field holding `V`.
    pub fn as_field<V: FieldValue>(&self) -> Option<Field<V>> {
        match self {
            Self::Field(field) => field.as_any().downcast_ref::<Field<V>>().cloned(),
            Self::Form(_) => None,
        }
    }

    /// Returns the nested form, if this node is one.
    pub fn as_form(&self) -> Option<&Form> {
        match self {
            Self::Field(_) => None,
            Self::Form(form) => Some(form),
        }
    }

    /// Collects every field below this node, keyed by dotted path.
    pub(crate) fn collect_fields<'a>(&'a self, path: String, out: &mut Vec<(String, &'a dyn Validatable)>) {
        match self {
            Self::Field(field) => out.push((path, field.as_ref())),
            Self::Form(form) => form.collect_fields(&path, out),
        }
    }
}

impl<V: FieldValue> From<Field<V>> for Node {
    fn from(field: Field<V>) -> Self {
        Self::Field(Box::new(field))
    }
}

impl From<Form> for Node {
    fn from(form: Form) -> Self {
        Self::Form(form)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f
                .debug_struct("Field")
                .field("value", &field.value_json().ok())
                .field("error", &field.error())
                .finish(),
            Self::Form(form) => fmt::Debug::fmt(form, f),
        }
    }
}
