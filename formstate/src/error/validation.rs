//! Validation error types

use super::FormError;

/// A failure raised by a validator itself.
///
/// This is not a validation message. A validator that cannot decide (a lookup
/// that errored, a dropped channel) reports a fault, and the validation call
/// that ran it fails with [`ValidationError::Fault`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidatorFault {
    /// Fault description.
    pub message: String,
}

impl ValidatorFault {
    /// Creates a new validator fault.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ValidatorFault {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ValidatorFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<std::io::Error> for ValidatorFault {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Error returned by validation calls.
///
/// A value that fails validation is not an error: it comes back as
/// [`ValidationResult::Invalid`](crate::validation::ValidationResult::Invalid).
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A validator in the pipeline faulted.
    #[error("Validator #{index} faulted: {source}")]
    Fault {
        /// Position of the validator in its pipeline.
        index: usize,
        #[source]
        source: ValidatorFault,
    },

    /// The form's value map could not be built.
    #[error(transparent)]
    Form(#[from] FormError),
}

impl ValidationError {
    /// Creates a new fault error.
    pub fn fault(index: usize, source: impl Into<ValidatorFault>) -> Self {
        Self::Fault {
            index,
            source: source.into(),
        }
    }
}
