//! Persistence configuration

use std::time::Duration;

/// Quiet period before changed values are written.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(1000);

/// Where and how often a form is saved.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use formstate_persist::PersistConfig;
///
/// let config = PersistConfig::new("signup").with_delay(Duration::from_millis(250));
/// assert_eq!(config.key, "signup");
/// ```
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Store key the form's values live under.
    ///
    /// Default: `"form"`
    pub key: String,

    /// Debounce window for saves.
    ///
    /// Default: 1 second
    pub delay: Duration,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            key: "form".to_string(),
            delay: DEFAULT_SAVE_DELAY,
        }
    }
}

impl PersistConfig {
    /// Creates a config for the given key with the default delay.
    pub fn new(key: impl Into<String>) -> Self {
        Self::default().with_key(key)
    }

    /// Sets the store key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the save delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PersistConfig::default();
        assert_eq!(config.key, "form");
        assert_eq!(config.delay, DEFAULT_SAVE_DELAY);
    }

    #[test]
    fn test_builders() {
        let config = PersistConfig::new("profile").with_delay(Duration::ZERO);
        assert_eq!(config.key, "profile");
        assert!(config.delay.is_zero());
    }
}
