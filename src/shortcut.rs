//! Shortcut templates.
//!
//! A shortcut substitutes a template for a matching prefix of the input
//! before header matching. Template placeholders: `{N}` is the Nth
//! remainder token, `{*}` joins all remaining tokens with the command
//! separator, `{*(SEP)}` joins with `SEP`, and `\{`/`\}` are literal
//! braces.

use crate::argv::split_all;
use crate::error::ParseError;
use crate::token::Token;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_fuzzy() -> bool {
    true
}

/// One shortcut definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShortcutEntry {
    /// First input token this shortcut responds to.
    pub key: String,
    /// Replacement command text.
    pub template: String,
    /// Allow trailing tokens after the key. When false, any trailing
    /// input is a mismatch.
    #[serde(default = "default_fuzzy")]
    pub fuzzy: bool,
    /// Prepend the command's canonical header to the expansion.
    #[serde(default)]
    pub prefix: bool,
}

impl ShortcutEntry {
    pub fn new(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            template: template.into(),
            fuzzy: true,
            prefix: false,
        }
    }

    pub fn exact(mut self) -> Self {
        self.fuzzy = false;
        self
    }

    pub fn prefixed(mut self) -> Self {
        self.prefix = true;
        self
    }
}

/// Ordered shortcut definitions for one command.
#[derive(Clone, Debug, Default)]
pub struct ShortcutStore {
    entries: Vec<ShortcutEntry>,
}

impl ShortcutStore {
    pub fn add(&mut self, entry: ShortcutEntry) {
        // Re-registering a key replaces the old definition in place.
        if let Some(slot) = self.entries.iter_mut().find(|e| e.key == entry.key) {
            *slot = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        self.entries.len() != before
    }

    pub fn entries(&self) -> &[ShortcutEntry] {
        &self.entries
    }

    pub fn find(&self, first_token: &str) -> Option<&ShortcutEntry> {
        self.entries.iter().find(|e| e.key == first_token)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static INDEX_SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("static pattern"));
static WILDCARD_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\*(?:\(([^)]*)\))?\}").expect("static pattern"));

const ESC_OPEN: char = '\u{1}';
const ESC_CLOSE: char = '\u{2}';

fn escape(s: &str) -> String {
    s.replace(r"\{", &ESC_OPEN.to_string())
        .replace(r"\}", &ESC_CLOSE.to_string())
}

fn unescape(s: &str) -> String {
    s.replace(ESC_OPEN, "{").replace(ESC_CLOSE, "}")
}

/// Fold consecutive text tokens into separator-joined strings, leaving
/// opaque tokens as standalone elements.
fn gen_extend(tokens: &[Token], sep: &str) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    for token in tokens {
        match (token, out.last_mut()) {
            (Token::Text(s), Some(Token::Text(prev))) => {
                prev.push_str(sep);
                prev.push_str(s);
            }
            _ => out.push(token.clone()),
        }
    }
    out
}

fn joined_text(tokens: &[Token], sep: &str) -> String {
    tokens
        .iter()
        .filter_map(Token::as_text)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Expand `entry` against the tokens remaining after its key.
///
/// Remainder tokens not consumed by a placeholder are appended after the
/// template. A placeholder with no corresponding remainder token is an
/// [`ParseError::ArgumentMissing`].
pub(crate) fn expand(
    entry: &ShortcutEntry,
    remainder: &[Token],
    seps: &[char],
) -> Result<Vec<Token>, ParseError> {
    if !entry.fuzzy {
        if let Some(extra) = remainder.first() {
            return Err(ParseError::ParamsUnmatched {
                token: extra.as_text().unwrap_or("<object>").to_string(),
                expected: format!("nothing after shortcut {:?}", entry.key),
            });
        }
    }
    let default_sep = seps.first().copied().unwrap_or(' ').to_string();
    let mut out: Vec<Token> = Vec::new();
    let mut used: HashSet<usize> = HashSet::new();
    let mut wildcard_taken = false;

    for raw in split_all(&entry.template, seps, true) {
        let escaped = escape(&raw);

        // A token that is exactly one index slot splices the remainder
        // token through unchanged, opaque payloads included.
        if let Some(caps) = INDEX_SLOT.captures(&escaped) {
            if caps.get(0).map(|m| m.as_str()) == Some(escaped.as_str()) {
                let index: usize = caps[1].parse().map_err(|_| ParseError::ArgumentMissing {
                    key: raw.clone(),
                })?;
                let Some(token) = remainder.get(index) else {
                    return Err(ParseError::ArgumentMissing {
                        key: format!("{{{index}}}"),
                    });
                };
                used.insert(index);
                out.push(token.clone());
                continue;
            }
        }

        if let Some(caps) = WILDCARD_SLOT.captures(&escaped) {
            let sep = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| default_sep.clone());
            let whole = caps.get(0).map(|m| m.as_str()) == Some(escaped.as_str());
            if whole {
                out.extend(gen_extend(remainder, &sep));
            } else {
                let joined = joined_text(remainder, &sep);
                let replaced = WILDCARD_SLOT.replace(&escaped, joined.as_str());
                out.push(Token::text(unescape(&replaced)));
            }
            used.extend(0..remainder.len());
            wildcard_taken = true;
            continue;
        }

        // Inline index slots substitute textually.
        let mut text = escaped.clone();
        let mut missing: Option<usize> = None;
        for caps in INDEX_SLOT.captures_iter(&escaped) {
            let index: usize = match caps[1].parse() {
                Ok(i) => i,
                Err(_) => continue,
            };
            match remainder.get(index).and_then(Token::as_text) {
                Some(s) => {
                    text = text.replace(&format!("{{{index}}}"), s);
                    used.insert(index);
                }
                None => missing = Some(index),
            }
        }
        if let Some(index) = missing {
            return Err(ParseError::ArgumentMissing {
                key: format!("{{{index}}}"),
            });
        }
        out.push(Token::text(unescape(&text)));
    }

    if !wildcard_taken {
        for (i, token) in remainder.iter().enumerate() {
            if !used.contains(&i) {
                out.push(token.clone());
            }
        }
    }
    Ok(out)
}
