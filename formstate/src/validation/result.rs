/// Outcome of validating a field or a form.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<T> {
    /// Every validator passed. Carries the value that was validated.
    Valid(T),
    /// A validator failed with this message.
    Invalid(String),
}

impl<T> ValidationResult<T> {
    /// Check if validation passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Check if validation failed.
    pub fn has_error(&self) -> bool {
        !self.is_valid()
    }

    /// Get the validated value (if validation passed).
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    /// Consume the result, returning the validated value (if validation passed).
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    /// Get the failure message (if validation failed).
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(message) => Some(message),
        }
    }
}
