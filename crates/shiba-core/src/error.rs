//! Error types for the shiba-core crate.
//!
//! This module provides the [`ConfigError`] type for failures that can occur
//! while loading the user configuration document. None of these errors reach
//! the caller of [`ConfigStore::load`](crate::ConfigStore::load): they are
//! logged and the built-in defaults are used instead.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use shiba_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "file_ext.markdown".to_owned(),
///     reason: "extension list must not be empty".to_owned(),
/// };
/// assert!(error.to_string().contains("file_ext.markdown"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The configuration file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid YAML or has the wrong shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// The platform has no per-user configuration directory.
    #[error("no per-user configuration directory is available")]
    NoConfigDir,
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
