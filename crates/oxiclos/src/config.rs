//! Runtime configuration.
//!
//! A [`RuntimeConfig`] is consumed by [`Runtime::with_config`]. Defaults are
//! suitable for tests and embedding; `from_env` lets a host pick the log
//! level without recompiling.
//!
//! [`Runtime::with_config`]: crate::runtime::Runtime::with_config

use oxiclos_log::Level;

/// Environment variable read by [`RuntimeConfig::from_env`].
pub const LOG_ENV_VAR: &str = "OXICLOS_LOG";

/// Configuration applied when a runtime is bootstrapped.
///
/// # Example
///
/// ```
/// use oxiclos::RuntimeConfig;
/// use oxiclos_log::Level;
///
/// let config = RuntimeConfig::default()
///     .with_log_level(Level::Debug)
///     .with_class_registry_capacity(256);
///
/// assert_eq!(config.log_level(), Some(Level::Debug));
/// assert_eq!(config.class_registry_capacity(), 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    log_level: Option<Level>,
    class_registry_capacity: usize,
    keyword_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            log_level: None,
            class_registry_capacity: 64,
            keyword_capacity: 64,
        }
    }
}

impl RuntimeConfig {
    /// Builds a configuration from the environment.
    ///
    /// `OXICLOS_LOG` selects the log level. An unset or unparsable value
    /// leaves the global logger untouched.
    #[must_use]
    pub fn from_env() -> Self {
        let log_level = std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|raw| Level::from_str(&raw).ok());
        RuntimeConfig {
            log_level,
            ..RuntimeConfig::default()
        }
    }

    /// Sets the level the global logger is switched to at bootstrap.
    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Sets the initial capacity of the class-name registry.
    #[must_use]
    pub fn with_class_registry_capacity(mut self, capacity: usize) -> Self {
        self.class_registry_capacity = capacity;
        self
    }

    /// Sets the initial capacity of the keyword table.
    #[must_use]
    pub fn with_keyword_capacity(mut self, capacity: usize) -> Self {
        self.keyword_capacity = capacity;
        self
    }

    /// Returns the configured log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<Level> {
        self.log_level
    }

    /// Returns the class registry capacity.
    #[must_use]
    pub fn class_registry_capacity(&self) -> usize {
        self.class_registry_capacity
    }

    /// Returns the keyword table capacity.
    #[must_use]
    pub fn keyword_capacity(&self) -> usize {
        self.keyword_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.log_level(), None);
        assert_eq!(config.class_registry_capacity(), 64);
        assert_eq!(config.keyword_capacity(), 64);
    }

    #[test]
    fn test_builder_setters() {
        let config = RuntimeConfig::default()
            .with_log_level(Level::Trace)
            .with_keyword_capacity(8);
        assert_eq!(config.log_level(), Some(Level::Trace));
        assert_eq!(config.keyword_capacity(), 8);
    }
}
