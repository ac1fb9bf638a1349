//! Form state and validation.
//!
//! Tracks values, dirtiness and validation errors for single fields and for
//! nested forms of fields. Validation is asynchronous, auto-validation on
//! change is debounced, and a composed form runs its own cross-field
//! validators by itself once every child has passed.

pub mod composition;
pub mod debounce;
pub mod error;
pub mod field;
pub mod form;
pub mod validation;

mod state;

pub use composition::{CompositionParent, Node, Validatable};
pub use field::{Change, Field, FieldValue};
pub use form::{Form, FormMode};

pub mod prelude {
    pub use crate::composition::{Node, Validatable};
    pub use crate::error::{FormError, ValidationError, ValidatorFault};
    pub use crate::field::{Change, Field, FieldValue};
    pub use crate::form::{Form, FormMode};
    pub use crate::validation::{Check, ValidationResult, Validator, rules};
}
