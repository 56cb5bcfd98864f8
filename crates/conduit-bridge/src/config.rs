//! Bridge configuration and bindings

use std::fmt;
use std::sync::Arc;

use conduit_sdk::{JsEngine, ManagedRuntime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed
    #[error("invalid bridge configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Tunables for a bridge instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Maximum member descriptors per metadata batch
    pub metadata_batch_size: usize,

    /// Bridged calls between memory-pressure reports (0 disables periodic
    /// reports; construction always reports)
    pub memory_report_interval: u32,

    /// Initial verbosity
    pub verbose_logging: bool,

    /// Install the cast and diagnostics globals at init
    pub install_globals: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            metadata_batch_size: 100,
            memory_report_interval: 16,
            verbose_logging: false,
            install_globals: true,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the bridge cannot operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "metadata_batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Process termination entry point used by `__exit`
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Everything [`Bridge::init`](crate::Bridge::init) consumes
pub struct BridgeBindings {
    /// Managed runtime collaborator
    pub runtime: Arc<dyn ManagedRuntime>,
    /// JavaScript engine collaborator
    pub engine: Arc<dyn JsEngine>,
    /// Tunables
    pub config: BridgeConfig,
    /// Called by the exit diagnostics entry point
    pub exit_hook: ExitHook,
}

impl BridgeBindings {
    /// Bindings with the default configuration and `std::process::exit`
    pub fn new(runtime: Arc<dyn ManagedRuntime>, engine: Arc<dyn JsEngine>) -> Self {
        Self {
            runtime,
            engine,
            config: BridgeConfig::default(),
            exit_hook: Arc::new(|code| std::process::exit(code)),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the exit hook
    pub fn with_exit_hook(mut self, hook: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit_hook = Arc::new(hook);
        self
    }
}

impl fmt::Debug for BridgeBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBindings")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.metadata_batch_size, 100);
        assert_eq!(config.memory_report_interval, 16);
        assert!(!config.verbose_logging);
        assert!(config.install_globals);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = BridgeConfig::from_json(r#"{ "metadata_batch_size": 8 }"#).unwrap();
        assert_eq!(config.metadata_batch_size, 8);
        assert_eq!(config.memory_report_interval, 16);
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = BridgeConfig::from_json(r#"{ "batch": 8 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_batch_size_is_invalid() {
        let err = BridgeConfig::from_json(r#"{ "metadata_batch_size": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "metadata_batch_size", .. }));
    }
}
