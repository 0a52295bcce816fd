//! Keyed message templates.
//!
//! The core emits stable keys plus named placeholders; rendering goes
//! through a [`LangStore`]. The built-in table is English; callers may
//! overlay an external YAML table.

use crate::error::ParseError;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum I18nError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

/// Message table mapping stable keys to `{placeholder}` templates.
#[derive(Debug, Clone)]
pub struct LangStore {
    entries: HashMap<String, String>,
}

impl Default for LangStore {
    fn default() -> Self {
        let entries = [
            ("header.mismatch", "unknown command entry {target}"),
            ("fuzzy.matched", "did you mean {candidate}?"),
            ("param.unmatched", "{token} does not match {expected}"),
            ("param.missing", "argument {slot} got no input"),
            ("args.key_missing", "keyword argument {key} is missing"),
            ("param.invalid", "invalid value for {slot}: {reason}"),
            ("query.ambiguous", "path {path} is ambiguous"),
            ("behavior.failed", "behavior {behavior} failed: {reason}"),
            ("builtin.triggered", "built-in {kind} option triggered"),
            ("argv.null_message", "the input contains no parseable element"),
            ("help.usage", "Usage:"),
            ("help.options", "Options:"),
            ("help.subcommands", "Subcommands:"),
            ("completion.prompt", "next possible input:"),
            ("shortcut.registered", "shortcut {key} registered"),
        ];
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl LangStore {
    /// Load a flat `key: template` YAML mapping over the built-in table.
    pub fn from_yaml(source: &str) -> Result<Self, I18nError> {
        let loaded: HashMap<String, String> = serde_saphyr::from_str(source)?;
        let mut store = Self::default();
        store.entries.extend(loaded);
        Ok(store)
    }

    /// Overlay another table on top of this one.
    pub fn merge(&mut self, other: LangStore) {
        self.entries.extend(other.entries);
    }

    /// The raw template for `key`; the key itself when unknown.
    pub fn require<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Render `key` with `{name}` placeholders substituted.
    pub fn format(&self, key: &str, placeholders: &[(&str, String)]) -> String {
        let mut text = self.require(key).to_string();
        for (name, value) in placeholders {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    /// Render a parse error through this table.
    pub fn render(&self, error: &ParseError) -> String {
        self.format(error.key(), &error.placeholders())
    }
}
