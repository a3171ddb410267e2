//! Tree configuration
//!
//! `TreeConfig` carries the settings every tree service shares. It is built
//! from defaults, optionally overridden by environment variables, and
//! validated once when a `TreeService` is constructed.

use crate::services::TreeError;
use crate::tree::{PathCodec, DEFAULT_PATH_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable overriding the path separator
pub const SEPARATOR_ENV: &str = "PATHTREE_SEPARATOR";

/// Environment variable overriding cycle rejection (`true`/`false`)
pub const REJECT_CYCLES_ENV: &str = "PATHTREE_REJECT_CYCLES";

/// Configuration for materialized-path maintenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Delimiter joining identifier segments in `path`
    ///
    /// Must never appear inside an identifier, or prefix queries become ambiguous.
    pub path_separator: String,

    /// Refuse re-parenting a node under itself or one of its descendants
    pub reject_cycles: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            reject_cycles: true,
        }
    }
}

impl TreeConfig {
    /// Defaults overridden by `PATHTREE_SEPARATOR` and `PATHTREE_REJECT_CYCLES`
    ///
    /// Unparseable boolean values fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(separator) = env::var(SEPARATOR_ENV) {
            config.path_separator = separator;
        }

        if let Some(reject) = env::var(REJECT_CYCLES_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<bool>().ok())
        {
            config.reject_cycles = reject;
        }

        config
    }

    /// Use a different separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    /// Enable or disable cycle rejection
    pub fn with_reject_cycles(mut self, reject: bool) -> Self {
        self.reject_cycles = reject;
        self
    }

    /// Validate configuration
    ///
    /// The separator must be non-empty and must not use characters found in
    /// generated UUID identifiers (ASCII alphanumerics and `-`).
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.path_separator.is_empty() {
            return Err(TreeError::invalid_config("path_separator cannot be empty"));
        }

        if self
            .path_separator
            .chars()
            .any(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(TreeError::invalid_config(format!(
                "path_separator '{}' collides with identifier characters",
                self.path_separator
            )));
        }

        Ok(())
    }

    /// Codec for this configuration's separator
    pub fn codec(&self) -> PathCodec {
        PathCodec::new(self.path_separator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.path_separator, "#");
        assert!(config.reject_cycles);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_separators() {
        assert!(TreeConfig::default().with_separator("").validate().is_err());
        assert!(TreeConfig::default().with_separator("-").validate().is_err());
        assert!(TreeConfig::default().with_separator("x").validate().is_err());
        assert!(TreeConfig::default().with_separator(".").validate().is_ok());
        assert!(TreeConfig::default().with_separator("::").validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: TreeConfig = serde_json::from_str(r#"{"path_separator": "/"}"#).unwrap();
        assert_eq!(config.path_separator, "/");
        assert!(config.reject_cycles);
    }

    #[test]
    fn test_from_env_overrides_defaults() {
        env::set_var(SEPARATOR_ENV, "::");
        env::set_var(REJECT_CYCLES_ENV, " false ");
        let config = TreeConfig::from_env();
        assert_eq!(config.path_separator, "::");
        assert!(!config.reject_cycles);

        env::set_var(REJECT_CYCLES_ENV, "sometimes");
        assert!(TreeConfig::from_env().reject_cycles);

        env::remove_var(SEPARATOR_ENV);
        env::remove_var(REJECT_CYCLES_ENV);
        assert_eq!(TreeConfig::from_env(), TreeConfig::default());
    }

    #[test]
    fn test_codec_uses_separator() {
        let codec = TreeConfig::default().with_separator("/").codec();
        assert_eq!(codec.encode_child("a", "b"), "a/b");
    }
}
