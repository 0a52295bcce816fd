//! Error taxonomy for schema construction and parsing.
//!
//! Parse failures are data, not control flow: unless the command enables
//! error raising, [`ParseError`] values end up in the result's
//! `error_info` field and callers check `matched`.

use std::fmt;

/// Which built-in option terminated the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Help,
    Shortcut,
    Completion,
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltinKind::Help => write!(f, "help"),
            BuiltinKind::Shortcut => write!(f, "shortcut"),
            BuiltinKind::Completion => write!(f, "completion"),
        }
    }
}

/// A parse-time failure, recorded on the result tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("header mismatch: {target:?} is not a valid entry for this command")]
    HeaderMismatch { target: String },
    #[error("header mismatch, did you mean {candidate:?}?")]
    FuzzySuggestion { candidate: String },
    #[error("token {token:?} does not match {expected}")]
    ParamsUnmatched { token: String, expected: String },
    #[error("required argument {slot:?} got no input")]
    ParamsMissing { slot: String },
    #[error("keyword argument {key:?} is missing")]
    ArgumentMissing { key: String },
    #[error("invalid value for {slot:?}: {reason}")]
    InvalidParam { slot: String, reason: String },
    #[error("path {path:?} is ambiguous, qualify it with 'options.' or 'subcommands.'")]
    AmbiguousPath { path: String },
    #[error("behavior {behavior:?} rejected the result: {reason}")]
    Behavior { behavior: String, reason: String },
    #[error("built-in {kind} option terminated the parse")]
    Builtin { kind: BuiltinKind },
    #[error("the input contains no parseable element")]
    NullMessage,
}

impl ParseError {
    /// Stable message key for lookup in a [`crate::i18n::LangStore`].
    pub fn key(&self) -> &'static str {
        match self {
            ParseError::HeaderMismatch { .. } => "header.mismatch",
            ParseError::FuzzySuggestion { .. } => "fuzzy.matched",
            ParseError::ParamsUnmatched { .. } => "param.unmatched",
            ParseError::ParamsMissing { .. } => "param.missing",
            ParseError::ArgumentMissing { .. } => "args.key_missing",
            ParseError::InvalidParam { .. } => "param.invalid",
            ParseError::AmbiguousPath { .. } => "query.ambiguous",
            ParseError::Behavior { .. } => "behavior.failed",
            ParseError::Builtin { .. } => "builtin.triggered",
            ParseError::NullMessage => "argv.null_message",
        }
    }

    /// Positional placeholders for the message template of [`Self::key`].
    pub fn placeholders(&self) -> Vec<(&'static str, String)> {
        match self {
            ParseError::HeaderMismatch { target } => vec![("target", target.clone())],
            ParseError::FuzzySuggestion { candidate } => vec![("candidate", candidate.clone())],
            ParseError::ParamsUnmatched { token, expected } => {
                vec![("token", token.clone()), ("expected", expected.clone())]
            }
            ParseError::ParamsMissing { slot } => vec![("slot", slot.clone())],
            ParseError::ArgumentMissing { key } => vec![("key", key.clone())],
            ParseError::InvalidParam { slot, reason } => {
                vec![("slot", slot.clone()), ("reason", reason.clone())]
            }
            ParseError::AmbiguousPath { path } => vec![("path", path.clone())],
            ParseError::Behavior { behavior, reason } => {
                vec![("behavior", behavior.clone()), ("reason", reason.clone())]
            }
            ParseError::Builtin { kind } => vec![("kind", kind.to_string())],
            ParseError::NullMessage => vec![],
        }
    }

    /// Whether this error still counts as a successful match.
    ///
    /// Built-in options terminate the parse cleanly.
    pub fn is_clean(&self) -> bool {
        matches!(self, ParseError::Builtin { .. })
    }
}

/// Rejected schema construction: bad node names, conflicting slots,
/// malformed header patterns.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("node name must not be empty")]
    NameEmpty,
    #[error("node name {0:?} contains a separator")]
    NameInvalid(String),
    #[error("duplicate argument slot {0:?}")]
    DuplicateSlot(String),
    #[error("at most one variadic slot is allowed, {0:?} is the second")]
    MultipleVariadic(String),
    #[error("at most one variadic keyword slot is allowed, {0:?} is the second")]
    MultipleVariadicKeyword(String),
    #[error("the rest slot {0:?} must be the last slot")]
    RestNotLast(String),
    #[error("invalid header pattern: {0}")]
    HeaderPattern(#[from] regex::Error),
    #[error("argument slot name {0:?} is reserved")]
    ReservedSlot(String),
}
