//! Form structure errors

/// Error type for misuse of a form or one of its nodes.
///
/// `key` is the dotted path of the offending node, relative to the form the
/// operation was called on. It is empty when the node itself is at fault.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// No child is registered under the key.
    #[error("Field '{key}' not found in form")]
    UnknownField { key: String },

    /// The child exists but holds a different value type.
    #[error("Field '{key}' type mismatch: expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// The node already has a parent, or the form was already composed.
    #[error("Node '{key}' is already composed")]
    AlreadyComposed { key: String },

    /// A JSON value could not be converted to or from the field's type.
    #[error("Invalid value for '{key}': {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A nested form received a value of the wrong JSON shape.
    #[error("Expected {expected} for '{key}'")]
    ShapeMismatch { key: String, expected: &'static str },
}

impl FormError {
    /// Creates a new unknown field error.
    pub fn unknown_field(key: impl Into<String>) -> Self {
        Self::UnknownField { key: key.into() }
    }

    /// Creates a new type mismatch error.
    pub fn type_mismatch(key: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected,
        }
    }

    /// Creates a new already composed error for the node itself.
    pub fn already_composed() -> Self {
        Self::AlreadyComposed { key: String::new() }
    }

    /// Creates a new invalid value error for the node itself.
    pub fn invalid_value(source: serde_json::Error) -> Self {
        Self::InvalidValue {
            key: String::new(),
            source,
        }
    }

    /// Returns the path of the offending node.
    pub fn key(&self) -> &str {
        match self {
            Self::UnknownField { key }
            | Self::TypeMismatch { key, .. }
            | Self::AlreadyComposed { key }
            | Self::InvalidValue { key, .. }
            | Self::ShapeMismatch { key, .. } => key,
        }
    }

    /// Prefixes the error's path with the key of the child it came from.
    pub fn within(mut self, parent: &str) -> Self {
        let key = match &mut self {
            Self::UnknownField { key }
            | Self::TypeMismatch { key, .. }
            | Self::AlreadyComposed { key }
            | Self::InvalidValue { key, .. }
            | Self::ShapeMismatch { key, .. } => key,
        };
        *key = if key.is_empty() {
            parent.to_string()
        } else {
            format!("{parent}.{key}")
        };
        self
    }
}
