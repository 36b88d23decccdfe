//! Core types shared across the shiba workspace.
//!
//! - [`Config`] and [`ConfigStore`]: the user configuration document, merged
//!   over built-in defaults and loaded once
//! - [`Category`] and [`classify`]: mapping file extensions to the pipeline
//!   that handles them
//! - [`emoji::replace_all`]: shortcode rewriting applied to rendered HTML
//! - [`ConfigError`]: configuration failures (always recovered by the store)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod category;
pub mod config;
pub mod emoji;
pub mod error;

pub use category::{Category, UnknownCategory, classify, classify_path};
pub use config::{Config, ConfigStore, DEFAULT_LINTER, merge_defaults};
pub use error::ConfigError;
