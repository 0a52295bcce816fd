//! Interactive completion sessions.
//!
//! A session runs the analyser in speculative mode: instead of failing at
//! the cursor's stopping point, the parse records what could legally come
//! next. The caller owns the session and advances it with `tab`/`enter`.

use crate::command::{Command, ParseInput};
use crate::registry::Registry;
use crate::result::ParseResult;
use crate::token::Token;

/// One completion interaction over a fixed input prefix.
pub struct CompSession {
    base: Vec<Token>,
    candidates: Vec<String>,
    index: usize,
}

impl CompSession {
    /// Speculatively parse `input` and capture the candidate set.
    pub fn new(cmd: &Command, input: impl Into<ParseInput>) -> Self {
        Self::with_registry(cmd, input, Registry::global())
    }

    pub fn with_registry(
        cmd: &Command,
        input: impl Into<ParseInput>,
        registry: &Registry,
    ) -> Self {
        let input = input.into();
        let base = input.clone().into_tokens();
        let result = crate::analyser::run_parse(cmd, input, registry, true);
        Self {
            base,
            candidates: result.candidates,
            index: 0,
        }
    }

    /// Whether any candidate is available.
    pub fn available(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// The currently selected candidate.
    pub fn current(&self) -> Option<&str> {
        self.candidates.get(self.index).map(String::as_str)
    }

    /// Cycle to the next candidate and return it.
    pub fn tab(&mut self) -> Option<&str> {
        if self.candidates.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.candidates.len();
        self.current()
    }

    /// Re-parse with the selected candidate appended to the input.
    pub fn enter(&self, cmd: &Command) -> ParseResult {
        let mut tokens = self.base.clone();
        if let Some(candidate) = self.current() {
            tokens.push(Token::text(candidate));
        }
        cmd.parse(tokens)
    }
}
