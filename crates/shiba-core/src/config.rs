//! Configuration document and its loader.
//!
//! The configuration is a small YAML document stored in the per-user
//! configuration directory (`<config_dir>/shiba/config.yml`):
//!
//! ```yaml
//! linter: mdast-lint
//! file_ext:
//!   markdown: [md, markdown, mkd]
//!   html: [html]
//! width: 800
//! height: 600
//! shortcuts:
//!   J: PageDown
//! lint_options: {}
//! ```
//!
//! Keys missing from the user's document are filled from [`Config::default`]
//! with [`merge_defaults`]. A document that can't be read, parsed or
//! validated is ignored as a whole and the defaults are used verbatim.

use std::sync::{Arc, OnceLock};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::category::Category;
use crate::error::ConfigError;

/// Name of the lint backend used when the document doesn't pick one.
pub const DEFAULT_LINTER: &str = "mdast-lint";

/// Directory below the platform configuration directory.
const APP_DIR_NAME: &str = "shiba";

/// File name of the configuration document.
const CONFIG_FILE_NAME: &str = "config.yml";

/// Default key bindings, in display order.
const DEFAULT_SHORTCUTS: [(&str, &str); 16] = [
    ("J", "PageDown"),
    ("K", "PageUp"),
    ("Down", "PageDown"),
    ("Up", "PageUp"),
    ("PageDown", "PageDown"),
    ("PageUp", "PageUp"),
    ("H", "PageLeft"),
    ("L", "PageRight"),
    ("Left", "PageLeft"),
    ("Right", "PageRight"),
    ("I", "PageTop"),
    ("M", "PageBottom"),
    ("Home", "PageTop"),
    ("End", "PageBottom"),
    ("Control+P", "ChangePath"),
    ("Control+L", "Lint"),
];

/// Root configuration for shiba.
///
/// Immutable once loaded; share it behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use shiba_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.linter, "mdast-lint");
/// assert_eq!(config.file_ext["markdown"], ["md", "markdown", "mkd"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the lint backend.
    pub linter: String,

    /// Extensions (without the leading dot) per category name.
    ///
    /// Order matters: classification picks the first list that contains an
    /// extension.
    pub file_ext: IndexMap<String, Vec<String>>,

    /// Preferred window width. Only used by the host.
    pub width: u32,

    /// Preferred window height. Only used by the host.
    pub height: u32,

    /// Key combination to command name. Only used by the host.
    pub shortcuts: IndexMap<String, String>,

    /// Backend-specific lint options, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_options: Option<Value>,
}

impl Default for Config {
    fn default() -> Self {
        let file_ext = IndexMap::from([
            (
                Category::Markdown.as_str().to_owned(),
                vec!["md".to_owned(), "markdown".to_owned(), "mkd".to_owned()],
            ),
            (Category::Html.as_str().to_owned(), vec!["html".to_owned()]),
        ]);

        let shortcuts = DEFAULT_SHORTCUTS
            .iter()
            .map(|(key, command)| ((*key).to_owned(), (*command).to_owned()))
            .collect();

        Self {
            linter: DEFAULT_LINTER.to_owned(),
            file_ext,
            width: 800,
            height: 600,
            shortcuts,
            lint_options: None,
        }
    }
}

impl Config {
    /// Parses a user document and fills its gaps from the defaults.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML or values of the
    /// wrong type, and [`ConfigError::InvalidOption`] if the merged document
    /// fails [`Config::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use shiba_core::Config;
    ///
    /// let config = Config::from_yaml_str("width: 1024\nfile_ext:\n  markdown: [md]\n").unwrap();
    /// assert_eq!(config.width, 1024);
    /// assert_eq!(config.height, 600);
    /// assert_eq!(config.file_ext["markdown"], ["md"]);
    /// assert_eq!(config.file_ext["html"], ["html"]);
    /// ```
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let mut document: Value = serde_yaml_ng::from_str(text)?;
        if document.is_null() {
            document = Value::Mapping(serde_yaml_ng::Mapping::new());
        }
        if !document.is_mapping() {
            return Err(ConfigError::invalid_option(
                "<root>",
                "configuration must be a mapping",
            ));
        }

        let defaults = serde_yaml_ng::to_value(Self::default())?;
        merge_defaults(&mut document, &defaults);

        let config: Self = serde_yaml_ng::from_value(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Checks that every category has a non-empty list of plain extensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            if !self.file_ext.contains_key(category.as_str()) {
                return Err(ConfigError::invalid_option(
                    format!("file_ext.{category}"),
                    "category is missing",
                ));
            }
        }

        for (name, extensions) in &self.file_ext {
            if extensions.is_empty() {
                return Err(ConfigError::invalid_option(
                    format!("file_ext.{name}"),
                    "extension list must not be empty",
                ));
            }
            if let Some(bad) = extensions
                .iter()
                .find(|ext| ext.is_empty() || ext.starts_with('.'))
            {
                return Err(ConfigError::invalid_option(
                    format!("file_ext.{name}"),
                    format!("'{bad}' is not a bare extension"),
                ));
            }
        }

        Ok(())
    }

    /// Returns the extensions configured for `category`.
    #[must_use]
    pub fn extensions(&self, category: Category) -> &[String] {
        self.file_ext
            .get(category.as_str())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the union of all extension lists, in order, without duplicates.
    #[must_use]
    pub fn all_extensions(&self) -> Vec<&str> {
        let mut all: Vec<&str> = Vec::new();
        for ext in self.file_ext.values().flatten() {
            if !all.contains(&ext.as_str()) {
                all.push(ext);
            }
        }
        all
    }
}

/// Fills the gaps of `target` with values from `defaults`.
///
/// For every key of a `defaults` mapping that `target` lacks, the default
/// value is copied. Keys present on both sides are recursed into when both
/// values are mappings; otherwise the `target` value is kept as is. Keys only
/// present in `target` are never touched. Sequences are leaves: a user list
/// replaces the default list entirely.
///
/// # Examples
///
/// ```
/// use shiba_core::merge_defaults;
/// use serde_yaml_ng::Value;
///
/// let mut user: Value = serde_yaml_ng::from_str("a: 1\nnested: {x: 10}\nextra: true").unwrap();
/// let defaults: Value = serde_yaml_ng::from_str("a: 0\nb: 2\nnested: {x: 0, y: 0}").unwrap();
/// merge_defaults(&mut user, &defaults);
///
/// let expected: Value =
///     serde_yaml_ng::from_str("a: 1\nnested: {x: 10, y: 0}\nextra: true\nb: 2").unwrap();
/// assert_eq!(user, expected);
/// ```
pub fn merge_defaults(target: &mut Value, defaults: &Value) {
    let (Value::Mapping(target), Value::Mapping(defaults)) = (target, defaults) else {
        return;
    };

    for (key, default_value) in defaults {
        if let Some(existing) = target.get_mut(key) {
            merge_defaults(existing, default_value);
        } else {
            target.insert(key.clone(), default_value.clone());
        }
    }
}

/// Loads the configuration document once and hands out the cached result.
///
/// The host builds a single store at startup and passes the loaded
/// [`Config`] to everything that needs it.
///
/// # Examples
///
/// ```no_run
/// use shiba_core::ConfigStore;
///
/// let store = ConfigStore::user_default();
/// let config = store.load();
/// println!("linting with {}", config.linter);
/// ```
#[derive(Debug, Default)]
pub struct ConfigStore {
    /// Location of the document, `None` if the platform has no config dir.
    path: Option<Utf8PathBuf>,

    /// The first load result, successful or fallback.
    loaded: OnceLock<Arc<Config>>,
}

impl ConfigStore {
    /// Creates a store reading the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            loaded: OnceLock::new(),
        }
    }

    /// Creates a store reading `<config_dir>/shiba/config.yml`.
    #[must_use]
    pub fn user_default() -> Self {
        Self {
            path: Self::default_path().ok(),
            loaded: OnceLock::new(),
        }
    }

    /// Returns the per-user location of the configuration document.
    pub fn default_path() -> Result<Utf8PathBuf, ConfigError> {
        let dir = dirs::config_dir()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Returns the document location, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Returns the configuration, loading it on first call.
    ///
    /// Never fails: load errors are logged and the defaults are used.
    pub fn load(&self) -> Arc<Config> {
        Arc::clone(self.loaded.get_or_init(|| {
            let config = match self.try_load() {
                Ok(config) => {
                    tracing::info!(path = ?self.path, "Loaded configuration");
                    config
                }
                Err(error) => {
                    tracing::warn!(
                        path = ?self.path,
                        error = %error,
                        "No usable configuration file, using defaults"
                    );
                    Config::default()
                }
            };
            Arc::new(config)
        }))
    }

    /// Reads, merges and validates the document without caching.
    pub fn try_load(&self) -> Result<Config, ConfigError> {
        let path = self.path.as_ref().ok_or(ConfigError::NoConfigDir)?;
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Config::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_yaml_ng::Mapping;
    use std::fs;
    use tempfile::TempDir;

    fn yaml(text: &str) -> Value {
        serde_yaml_ng::from_str(text).expect("valid yaml")
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.linter, "mdast-lint");
        assert_eq!(config.extensions(Category::Markdown), ["md", "markdown", "mkd"]);
        assert_eq!(config.extensions(Category::Html), ["html"]);
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 600);
        assert_eq!(config.shortcuts.len(), 16);
        assert_eq!(config.shortcuts["Control+P"], "ChangePath");
        assert!(config.lint_options.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_extensions_union() {
        let config = Config::default();
        assert_eq!(config.all_extensions(), ["md", "markdown", "mkd", "html"]);
    }

    #[test]
    fn test_from_yaml_partial_document() {
        let config = Config::from_yaml_str("linter: markdownlint\nfile_ext:\n  markdown: [md]\n")
            .expect("valid config");
        assert_eq!(config.linter, "markdownlint");
        assert_eq!(config.file_ext["markdown"], ["md"]);
        assert_eq!(config.file_ext["html"], ["html"]);
        assert_eq!(config.width, 800);
        assert_eq!(config.shortcuts.len(), 16);
    }

    #[test]
    fn test_from_yaml_keeps_user_shortcuts_and_fills_rest() {
        let config =
            Config::from_yaml_str("shortcuts:\n  J: PageUp\n  Q: Quit\n").expect("valid config");
        assert_eq!(config.shortcuts["J"], "PageUp");
        assert_eq!(config.shortcuts["Q"], "Quit");
        assert_eq!(config.shortcuts["End"], "PageBottom");
    }

    #[test]
    fn test_from_yaml_lint_options_pass_through() {
        let config = Config::from_yaml_str("lint_options:\n  line_length: 120\n")
            .expect("valid config");
        let options = config.lint_options.expect("options kept");
        assert_eq!(options["line_length"], Value::from(120));
    }

    #[test]
    fn test_from_yaml_empty_document() {
        let config = Config::from_yaml_str("").expect("empty is fine");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_yaml_rejects_scalar_root() {
        assert!(matches!(
            Config::from_yaml_str("just a string"),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_from_yaml_rejects_wrong_types() {
        assert!(matches!(
            Config::from_yaml_str("width: wide"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_empty_list() {
        let result = Config::from_yaml_str("file_ext:\n  html: []\n");
        assert!(matches!(result, Err(ConfigError::InvalidOption { .. })));
    }

    #[test]
    fn test_validate_leading_dot() {
        let result = Config::from_yaml_str("file_ext:\n  markdown: ['.md']\n");
        assert!(matches!(result, Err(ConfigError::InvalidOption { .. })));
    }

    #[test]
    fn test_merge_leaf_user_wins() {
        let mut user = yaml("width: 1000");
        merge_defaults(&mut user, &yaml("width: 800\nheight: 600"));
        assert_eq!(user, yaml("width: 1000\nheight: 600"));
    }

    #[test]
    fn test_merge_sequences_are_leaves() {
        let mut user = yaml("exts: [md]");
        merge_defaults(&mut user, &yaml("exts: [md, markdown, mkd]"));
        assert_eq!(user, yaml("exts: [md]"));
    }

    #[test]
    fn test_merge_type_mismatch_keeps_user() {
        let mut user = yaml("file_ext: none");
        merge_defaults(&mut user, &yaml("file_ext: {markdown: [md]}"));
        assert_eq!(user, yaml("file_ext: none"));
    }

    #[test]
    fn test_store_missing_file_falls_back() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.yml")).expect("utf8");
        let store = ConfigStore::new(path);

        assert!(matches!(store.try_load(), Err(ConfigError::Io { .. })));
        assert_eq!(*store.load(), Config::default());
    }

    #[test]
    fn test_store_malformed_file_falls_back() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.yml")).expect("utf8");
        fs::write(&path, "linter: [unclosed").expect("write");

        let store = ConfigStore::new(path);
        assert_eq!(*store.load(), Config::default());
    }

    #[test]
    fn test_store_loads_and_memoizes() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.yml")).expect("utf8");
        fs::write(&path, "linter: markdownlint\n").expect("write");

        let store = ConfigStore::new(&path);
        let first = store.load();
        assert_eq!(first.linter, "markdownlint");

        // Later edits are not observed by the same store.
        fs::write(&path, "linter: something-else\n").expect("write");
        let second = store.load();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.linter, "markdownlint");
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
        ]
    }

    fn document() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-d]", inner, 0..4).prop_map(|entries| {
                let mut mapping = Mapping::new();
                for (k, v) in entries {
                    mapping.insert(Value::from(k), v);
                }
                Value::Mapping(mapping)
            })
        })
    }

    fn check_merge(merged: &Value, user: &Value, defaults: &Value) -> Result<(), TestCaseError> {
        match (user, defaults) {
            (Value::Mapping(u), Value::Mapping(d)) => {
                let Value::Mapping(m) = merged else {
                    return Err(TestCaseError::fail("merged mapping became a leaf"));
                };
                for (key, default_value) in d {
                    let merged_value = m
                        .get(key)
                        .ok_or_else(|| TestCaseError::fail("default key missing"))?;
                    match u.get(key) {
                        Some(user_value) => check_merge(merged_value, user_value, default_value)?,
                        None => prop_assert_eq!(merged_value, default_value),
                    }
                }
                for (key, user_value) in u {
                    if !d.contains_key(key) {
                        prop_assert_eq!(m.get(key), Some(user_value));
                    }
                }
                Ok(())
            }
            _ => {
                prop_assert_eq!(merged, user);
                Ok(())
            }
        }
    }

    proptest! {
        #[test]
        fn prop_merge_contains_defaults_and_keeps_user(
            user in document(),
            defaults in document(),
        ) {
            let mut merged = user.clone();
            merge_defaults(&mut merged, &defaults);
            check_merge(&merged, &user, &defaults)?;
        }

        #[test]
        fn prop_merge_is_idempotent(user in document(), defaults in document()) {
            let mut once = user.clone();
            merge_defaults(&mut once, &defaults);
            let mut twice = once.clone();
            merge_defaults(&mut twice, &defaults);
            prop_assert_eq!(once, twice);
        }
    }
}
