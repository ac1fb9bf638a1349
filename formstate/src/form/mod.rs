//! Forms: validatable collections of fields and nested forms.
//!
//! A [`Form`] aggregates the errors of its children and owns form-level
//! validators that see the whole value map. Child errors always win: the
//! form-level validators only run once every child is valid, and
//! [`Form::error`] reports a field error before the form error.
//!
//! # Example
//!
//! ```
//! use formstate::{Field, Form};
//! use formstate::validation::{rules, Validator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let password = Field::new(String::new()).validators([rules::required("Password is required")]);
//! let confirm = Field::new(String::new());
//!
//! let form = Form::keyed([("password", password.clone()), ("confirm", confirm.clone())])
//!     .validators([Validator::new(|values: &serde_json::Value| {
//!         (values["password"] != values["confirm"]).then(|| "Passwords differ".to_string())
//!     })])
//!     .compose()
//!     .unwrap();
//!
//! password.on_change("hunter2".into());
//! confirm.on_change("hunter3".into());
//! form.validate().await.unwrap();
//!
//! assert_eq!(form.error().as_deref(), Some("Passwords differ"));
//! assert!(form.show_form_error());
//! # }
//! ```

mod compose;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};

use crate::composition::{CompositionParent, Node, Validatable};
use crate::error::{FormError, ValidationError};
use crate::field::{Field, FieldValue};
use crate::state::State;
use crate::validation::{ValidationResult, Validator, pipeline};

/// How a form's children are addressed, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    /// Children have string keys; values project to a JSON object.
    Keyed,
    /// Children are addressed by index; values project to a JSON array.
    List,
}

struct FormState {
    form_error: Option<String>,
    validators: Arc<[Validator<Value>]>,
    /// Indices of children that passed validation since their last reset.
    validated_children: HashSet<usize>,
    /// Validations in flight, including one claimed by convergence.
    validating: usize,
    auto_validation_enabled: bool,
    composed: bool,
    parent: Option<CompositionParent>,
}

struct FormInner {
    mode: FormMode,
    children: Vec<(String, Node)>,
    state: State<FormState>,
}

/// A validatable collection of fields and nested forms.
///
/// `Form` is a handle: clones share the same state.
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

impl Form {
    /// Create a form whose children are addressed by key.
    ///
    /// A repeated key replaces the earlier child in place.
    pub fn keyed<I, K, N>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<Node>,
    {
        let mut entries: Vec<(String, Node)> = Vec::new();
        for (key, child) in children {
            let key = key.into();
            let child = child.into();
            match entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = child,
                None => entries.push((key, child)),
            }
        }
        Self::with_children(FormMode::Keyed, entries)
    }

    /// Create a form whose children are addressed by index.
    pub fn list<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        let entries = children
            .into_iter()
            .enumerate()
            .map(|(index, child)| (index.to_string(), child.into()))
            .collect();
        Self::with_children(FormMode::List, entries)
    }

    fn with_children(mode: FormMode, children: Vec<(String, Node)>) -> Self {
        let state = FormState {
            form_error: None,
            validators: Arc::from(Vec::new()),
            validated_children: HashSet::new(),
            validating: 0,
            auto_validation_enabled: false,
            composed: false,
            parent: None,
        };

        Self {
            inner: Arc::new(FormInner {
                mode,
                children,
                state: State::new(state),
            }),
        }
    }

    /// Replace the form-level validators. They receive [`Form::values`].
    pub fn validators<I>(self, validators: I) -> Self
    where
        I: IntoIterator<Item = Validator<Value>>,
    {
        let validators: Arc<[Validator<Value>]> = validators.into_iter().collect();
        self.inner.state.update(|s| s.validators = validators);
        self
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn mode(&self) -> FormMode {
        self.inner.mode
    }

    pub fn len(&self) -> usize {
        self.inner.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.children.is_empty()
    }

    /// Child keys in order. In list mode these are the indices.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.children.iter().map(|(key, _)| key.as_str())
    }

    /// Children in order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.inner
            .children
            .iter()
            .map(|(key, child)| (key.as_str(), child))
    }

    /// Get a child by key.
    pub fn get(&self, key: &str) -> Result<&Node, FormError> {
        self.index_of(key).map(|index| &self.inner.children[index].1)
    }

    /// Get a typed handle to a child field.
    pub fn field<V: FieldValue>(&self, key: &str) -> Result<Field<V>, FormError> {
        self.get(key)?
            .as_field::<V>()
            .ok_or_else(|| FormError::type_mismatch(key, std::any::type_name::<V>()))
    }

    /// Get a nested form.
    pub fn form(&self, key: &str) -> Result<Form, FormError> {
        self.get(key)?
            .as_form()
            .cloned()
            .ok_or_else(|| FormError::type_mismatch(key, "form"))
    }

    /// Every field in the tree, depth first, keyed by dotted path.
    pub fn fields(&self) -> Vec<(String, &dyn Validatable)> {
        let mut out = Vec::new();
        self.collect_fields("", &mut out);
        out
    }

    pub(crate) fn collect_fields<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a dyn Validatable)>) {
        for (key, child) in &self.inner.children {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            child.collect_fields(path, out);
        }
    }

    fn index_of(&self, key: &str) -> Result<usize, FormError> {
        self.inner
            .children
            .iter()
            .position(|(existing, _)| existing == key)
            .ok_or_else(|| FormError::unknown_field(key))
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Values as last written by changes, keyed like the children.
    pub fn values(&self) -> Result<Value, FormError> {
        self.project(Node::value)
    }

    /// Values as last confirmed by validation, keyed like the children.
    pub fn safe_values(&self) -> Result<Value, FormError> {
        self.project(Node::safe_value)
    }

    fn project(&self, value_of: impl Fn(&Node) -> Result<Value, FormError>) -> Result<Value, FormError> {
        let children = &self.inner.children;
        match self.inner.mode {
            FormMode::Keyed => {
                let mut map = Map::with_capacity(children.len());
                for (key, child) in children {
                    map.insert(key.clone(), value_of(child).map_err(|e| e.within(key))?);
                }
                Ok(Value::Object(map))
            }
            FormMode::List => children
                .iter()
                .map(|(key, child)| value_of(child).map_err(|e| e.within(key)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Pairs each entry of `values` with the index of its child.
    ///
    /// Objects are matched by key, arrays by position (list mode only).
    /// Every key is checked before anything is returned.
    fn locate(&self, values: Value) -> Result<Vec<(usize, Value)>, FormError> {
        match (self.inner.mode, values) {
            (_, Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| self.index_of(&key).map(|index| (index, value)))
                .collect(),
            (FormMode::List, Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    if index < self.len() {
                        Ok((index, value))
                    } else {
                        Err(FormError::unknown_field(index.to_string()))
                    }
                })
                .collect(),
            (FormMode::Keyed, _) => Err(FormError::ShapeMismatch {
                key: String::new(),
                expected: "an object",
            }),
            (FormMode::List, _) => Err(FormError::ShapeMismatch {
                key: String::new(),
                expected: "an object or an array",
            }),
        }
    }

    // ------------------------------------------------------------------
    // Error aggregation
    // ------------------------------------------------------------------

    /// Check if any child has an error.
    pub fn has_field_error(&self) -> bool {
        self.inner.children.iter().any(|(_, child)| child.has_error())
    }

    /// The first child error, in key order.
    pub fn field_error(&self) -> Option<String> {
        self.inner.children.iter().find_map(|(_, child)| child.error())
    }

    pub fn has_form_error(&self) -> bool {
        self.inner
            .state
            .read(|s| s.form_error.as_deref().is_some_and(|e| !e.is_empty()))
    }

    /// The result of the form-level validators.
    pub fn form_error(&self) -> Option<String> {
        self.inner.state.read(|s| s.form_error.clone())
    }

    /// The form error is only shown while no field has an error.
    pub fn show_form_error(&self) -> bool {
        !self.has_field_error() && self.has_form_error()
    }

    pub fn has_error(&self) -> bool {
        self.has_field_error() || self.has_form_error()
    }

    /// The single error to display: a field error masks the form error.
    pub fn error(&self) -> Option<String> {
        self.field_error().or_else(|| self.form_error())
    }

    pub fn set_form_error(&self, error: Option<String>) {
        let error = error.filter(|message| !message.is_empty());
        self.inner.state.update(|s| s.form_error = error);
    }

    pub fn clear_form_error(&self) {
        self.set_form_error(None);
    }

    /// Clear the errors of every field in the tree. The form error stays.
    pub fn reset_validation_error(&self) {
        for (_, child) in &self.inner.children {
            child.clear_error();
        }
    }

    pub fn is_changed(&self) -> bool {
        self.inner.children.iter().any(|(_, child)| child.is_changed())
    }

    pub fn is_validating(&self) -> bool {
        self.inner.state.read(|s| s.validating > 0)
    }

    pub fn is_auto_validation_enabled(&self) -> bool {
        self.inner.state.read(|s| s.auto_validation_enabled)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Validate every child concurrently, then the form itself.
    ///
    /// If any child ends up with an error the form-level validators are not
    /// run and the result carries [`Form::error`]. Otherwise they run against
    /// [`Form::values`] and set the form error. A validator fault anywhere in
    /// the tree fails the call.
    pub async fn validate(&self) -> Result<ValidationResult<Value>, ValidationError> {
        self.inner.state.update(|s| s.validating += 1);
        self.run_claimed_validation().await
    }

    /// Runs a validation whose `validating` slot was already claimed.
    async fn run_claimed_validation(&self) -> Result<ValidationResult<Value>, ValidationError> {
        let outcome = self.validate_tree().await;
        self.inner
            .state
            .update(|s| s.validating = s.validating.saturating_sub(1));

        let result = outcome?;
        if result.is_valid() {
            self.notify_validation_pass().await;
        }
        Ok(result)
    }

    async fn validate_tree(&self) -> Result<ValidationResult<Value>, ValidationError> {
        let pending: Vec<_> = self
            .inner
            .children
            .iter()
            .map(|(_, child)| child.validate())
            .collect();

        for outcome in join_all(pending).await {
            outcome?;
        }

        // A child's own outcome may have been superseded by a newer validation.
        if self.has_field_error() {
            log::debug!("form validation stopped at field errors");
            return Ok(ValidationResult::Invalid(self.error().unwrap_or_default()));
        }

        let values = self.values()?;
        let validators = self.inner.state.read(|s| Arc::clone(&s.validators));
        let message = pipeline::run(&values, &validators).await?;

        self.inner.state.update(|s| s.form_error = message.clone());

        Ok(match message {
            Some(message) => ValidationResult::Invalid(message),
            None => ValidationResult::Valid(values),
        })
    }

    /// Reset every child to its construction value.
    ///
    /// The form error is left alone; it clears once a child passes again.
    pub fn reset(&self) {
        for (_, child) in &self.inner.children {
            child.reset();
        }
        self.notify_init();
    }

    /// Reset only the children named in `values` to the given values.
    ///
    /// `values` is an object keyed like the children, or in list mode an
    /// array by position. Every key and value is checked before any child is
    /// touched, so a failing call leaves the form as it was.
    pub fn reset_with(&self, values: Value) -> Result<(), FormError> {
        for (index, value) in self.prepare(values, false)? {
            let (key, child) = &self.inner.children[index];
            child.reset_to(value).map_err(|e| e.within(key))?;
        }
        self.notify_init();
        Ok(())
    }

    /// Apply change events to the children named in `values`.
    ///
    /// `null` entries are skipped. Every key and value is checked before any
    /// child is touched.
    pub fn change_with(&self, values: Value) -> Result<(), FormError> {
        for (index, value) in self.prepare(values, true)? {
            let (key, child) = &self.inner.children[index];
            child.change(value).map_err(|e| e.within(key))?;
        }
        Ok(())
    }

    /// Checks `values` the way `reset_with` (or, with `skip_nulls`,
    /// `change_with`) would apply them, without applying anything.
    pub(crate) fn check_entries(&self, values: &Value, skip_nulls: bool) -> Result<(), FormError> {
        self.prepare(values.clone(), skip_nulls).map(drop)
    }

    /// Locates and checks every entry of `values`.
    fn prepare(&self, values: Value, skip_nulls: bool) -> Result<Vec<(usize, Value)>, FormError> {
        let mut entries = self.locate(values)?;
        if skip_nulls {
            entries.retain(|(_, value)| !value.is_null());
        }

        for (index, value) in &entries {
            let (key, child) = &self.inner.children[*index];
            child.check(value, skip_nulls).map_err(|e| e.within(key))?;
        }
        Ok(entries)
    }

    /// Turn auto-validation on for the whole tree.
    pub fn enable_auto_validation(&self) {
        self.set_auto_validation(true);
    }

    /// Turn auto-validation off for the whole tree.
    pub fn disable_auto_validation(&self) {
        self.set_auto_validation(false);
    }

    fn set_auto_validation(&self, enabled: bool) {
        self.inner.state.update(|s| s.auto_validation_enabled = enabled);
        for (_, child) in &self.inner.children {
            child.set_auto_validation(enabled);
        }
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("mode", &self.inner.mode)
            .field("children", &self.inner.children)
            .field("form_error", &self.form_error())
            .finish()
    }
}
