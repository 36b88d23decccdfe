//! Built-in lint backends.
//!
//! - [`mdast::MdastLint`] (`mdast-lint`): structural rules over the markdown
//!   syntax tree
//! - [`markdownlint::MarkdownLint`] (`markdownlint`): line-oriented rules
//!
//! Both accept a mapping of rule id to `false` in `lint_options` to switch
//! individual rules off.

pub mod markdownlint;
pub mod mdast;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_yaml_ng::Value;

use crate::error::LintError;

/// Per-rule on/off switches. Rules are on unless listed as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleToggles(FxHashMap<String, bool>);

impl RuleToggles {
    /// Creates toggles from `(rule, enabled)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` unless `rule` was explicitly disabled.
    #[must_use]
    pub fn is_enabled(&self, rule: &str) -> bool {
        self.0.get(rule).copied().unwrap_or(true)
    }
}

/// Deserializes backend options, treating absent options as the default.
fn parse_options<T>(backend: &str, options: Option<&Value>) -> Result<T, LintError>
where
    T: DeserializeOwned + Default,
{
    match options {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_yaml_ng::from_value(value.clone())
            .map_err(|e| LintError::invalid_options(backend, e.to_string())),
    }
}

/// Splits a mapping into rule toggles, ignoring keys claimed by `reserved`.
fn parse_toggles(
    backend: &str,
    options: Option<&Value>,
    reserved: &[&str],
) -> Result<RuleToggles, LintError> {
    let Some(Value::Mapping(mapping)) = options else {
        return match options {
            None | Some(Value::Null) => Ok(RuleToggles::default()),
            Some(_) => Err(LintError::invalid_options(
                backend,
                "lint_options must be a mapping",
            )),
        };
    };

    let mut toggles = FxHashMap::default();
    for (key, value) in mapping {
        let Some(rule) = key.as_str() else {
            return Err(LintError::invalid_options(backend, "rule names must be strings"));
        };
        if reserved.contains(&rule) {
            continue;
        }
        let Some(enabled) = value.as_bool() else {
            return Err(LintError::invalid_options(
                backend,
                format!("rule '{rule}' must be true or false"),
            ));
        };
        toggles.insert(rule.to_owned(), enabled);
    }
    Ok(RuleToggles(toggles))
}

/// Converts a byte offset within `line` to a 1-based character column.
fn column_of(line: &str, byte_index: usize) -> usize {
    line.get(..byte_index).map_or(1, |prefix| prefix.chars().count() + 1)
}
