//! Stateful cursor over the input token stream.
//!
//! The cursor only moves forward except through explicit rollback. A
//! successful match commits its advancement; a failed match restores the
//! snapshot it took on entry. Text tokens are split lazily on the active
//! separator set, which lets an option split a token mid-way (compact
//! matching) and push the remainder back.

use crate::error::ParseError;
use crate::token::{OpaqueToken, Token};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Transformer applied to opaque tokens of a registered type before
/// matching. Returning `None` drops the token.
pub type Preprocessor = Arc<dyn Fn(&OpaqueToken) -> Option<Token> + Send + Sync>;

/// Ingest configuration for building an [`Argv`].
#[derive(Clone, Default)]
pub struct ArgvOptions {
    /// Token boundary characters; whitespace when empty.
    pub separators: Vec<char>,
    /// Treat CR/LF as separators too.
    pub filter_crlf: bool,
    pub preprocessors: HashMap<TypeId, Preprocessor>,
    /// Opaque token types dropped from the stream.
    pub filter_out: HashSet<TypeId>,
}

impl std::fmt::Debug for ArgvOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgvOptions")
            .field("separators", &self.separators)
            .field("filter_crlf", &self.filter_crlf)
            .field("preprocessors", &self.preprocessors.len())
            .field("filter_out", &self.filter_out)
            .finish()
    }
}

impl ArgvOptions {
    pub fn with_separators(separators: Vec<char>) -> Self {
        Self {
            separators,
            filter_crlf: true,
            ..Self::default()
        }
    }

    fn seps(&self) -> &[char] {
        if self.separators.is_empty() {
            &[' ']
        } else {
            &self.separators
        }
    }
}

/// Saved cursor state for backtracking.
#[derive(Clone)]
pub struct Snapshot {
    tokens: Vec<Token>,
    cursor: usize,
    rest_sep: Option<char>,
}

/// Cursor over the ingested token stream.
#[derive(Clone, Debug)]
pub struct Argv {
    opts: ArgvOptions,
    origin: Vec<Token>,
    tokens: Vec<Token>,
    cursor: usize,
    /// Separator that split the current token mid-way, if any. Rollback
    /// uses it to re-join the head with the remainder.
    rest_sep: Option<char>,
}

impl Argv {
    /// Normalize raw input into a token stream.
    ///
    /// Strings are kept whole here; separator splitting happens lazily in
    /// [`Self::next`]. Opaque elements run through preprocessors, then the
    /// filter-out set. An input with no usable element is an error.
    pub fn build(input: Vec<Token>, opts: ArgvOptions) -> Result<Self, ParseError> {
        let origin = input.clone();
        let mut tokens = Vec::with_capacity(input.len());
        for unit in input {
            let unit = match unit {
                Token::Opaque(o) => {
                    if opts.filter_out.contains(&o.type_id()) {
                        continue;
                    }
                    match opts.preprocessors.get(&o.type_id()) {
                        Some(proc) => match proc(&o) {
                            Some(t) => t,
                            None => continue,
                        },
                        None => Token::Opaque(o),
                    }
                }
                t => t,
            };
            match unit {
                Token::Text(s) => {
                    let trimmed = s.trim();
                    if !trimmed.is_empty() {
                        tokens.push(Token::Text(trimmed.to_string()));
                    }
                }
                t => tokens.push(t),
            }
        }
        if tokens.is_empty() {
            return Err(ParseError::NullMessage);
        }
        Ok(Self {
            opts,
            origin,
            tokens,
            cursor: 0,
            rest_sep: None,
        })
    }

    pub fn done(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Original input, before preprocessing.
    pub fn origin(&self) -> &[Token] {
        &self.origin
    }

    /// Stable hash of the original input, for the record cache.
    pub fn input_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.origin.hash(&mut hasher);
        hasher.finish()
    }

    /// Consume and return the next token, splitting text on `seps` (the
    /// default separator set when `None`).
    pub fn next(&mut self, seps: Option<&[char]>) -> Option<Token> {
        self.rest_sep = None;
        if self.done() {
            return None;
        }
        let seps: Vec<char> = seps.unwrap_or_else(|| self.opts.seps()).to_vec();
        match &self.tokens[self.cursor] {
            Token::Text(s) => {
                let (head, rest) = split_once(s, &seps, self.opts.filter_crlf);
                if rest.is_empty() {
                    self.cursor += 1;
                } else {
                    self.rest_sep = Some(seps[0]);
                    self.tokens[self.cursor] = Token::Text(rest);
                }
                Some(Token::Text(head))
            }
            Token::Opaque(_) => {
                let token = self.tokens[self.cursor].clone();
                self.cursor += 1;
                Some(token)
            }
        }
    }

    /// Look at the next token without committing cursor movement.
    pub fn peek(&self, seps: Option<&[char]>) -> Option<Token> {
        let token = self.tokens.get(self.cursor)?;
        match token {
            Token::Text(s) => {
                let seps = seps.unwrap_or_else(|| self.opts.seps());
                let (head, _) = split_once(s, seps, self.opts.filter_crlf);
                Some(Token::Text(head))
            }
            Token::Opaque(_) => Some(token.clone()),
        }
    }

    /// Put a consumed token back.
    ///
    /// With `replace`, the pushed token overwrites what the cursor would
    /// re-read; compact matching uses this to substitute the unconsumed
    /// remainder of a split token.
    pub fn rollback(&mut self, token: Token, replace: bool) {
        if matches!(&token, Token::Text(s) if s.is_empty()) {
            return;
        }
        if let Some(sep) = self.rest_sep {
            if let Token::Text(head) = &token {
                self.rest_sep = None;
                let merged = match self.tokens.get(self.cursor) {
                    Some(Token::Text(cur)) => Some(format!("{head}{sep}{cur}")),
                    _ => None,
                };
                match merged {
                    Some(joined) => self.tokens[self.cursor] = Token::Text(joined),
                    None => self.tokens.insert(self.cursor, token),
                }
                return;
            }
            self.rest_sep = None;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
            if replace {
                self.tokens[self.cursor] = token;
            }
        } else if replace {
            self.tokens.insert(0, token);
        }
    }

    /// Remaining tokens, fully split.
    pub fn release(&self, seps: Option<&[char]>) -> Vec<Token> {
        let seps = seps.unwrap_or_else(|| self.opts.seps());
        let mut out = Vec::new();
        for token in &self.tokens[self.cursor.min(self.tokens.len())..] {
            match token {
                Token::Text(s) => {
                    out.extend(
                        split_all(s, seps, self.opts.filter_crlf)
                            .into_iter()
                            .map(Token::Text),
                    );
                }
                t => out.push(t.clone()),
            }
        }
        out
    }

    /// Consume everything left in the stream.
    pub fn drain(&mut self) {
        self.cursor = self.tokens.len();
        self.rest_sep = None;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tokens: self.tokens.clone(),
            cursor: self.cursor,
            rest_sep: self.rest_sep,
        }
    }

    pub fn restore(&mut self, snap: Snapshot) {
        self.tokens = snap.tokens;
        self.cursor = snap.cursor;
        self.rest_sep = snap.rest_sep;
    }

    /// Replace the stream contents, used by shortcut expansion.
    pub(crate) fn reload(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens;
        self.cursor = 0;
        self.rest_sep = None;
    }
}

fn is_sep(c: char, seps: &[char], filter_crlf: bool) -> bool {
    seps.contains(&c) || (filter_crlf && (c == '\n' || c == '\r'))
}

/// Split off the first token of `s`, honoring backslash escapes and paired
/// quotes.
///
/// Quotes opening at a token boundary are stripped; quotes opening
/// mid-token are preserved but still protect separators until closed.
/// Backslash escapes separators, quotes, and itself; any other escape
/// keeps the backslash.
pub(crate) fn split_once(s: &str, seps: &[char], filter_crlf: bool) -> (String, String) {
    let mut head = String::new();
    let mut chars = s.char_indices().peekable();
    let mut quote: Option<(char, bool)> = None; // (quote char, strip?)
    let mut end = s.len();

    while let Some(&(i, c)) = chars.peek() {
        match quote {
            Some((q, strip)) => {
                chars.next();
                if c == q {
                    quote = None;
                    if !strip {
                        head.push(c);
                    }
                } else {
                    head.push(c);
                }
            }
            None => {
                if is_sep(c, seps, filter_crlf) {
                    if head.is_empty() {
                        chars.next();
                        continue;
                    }
                    end = i;
                    break;
                }
                chars.next();
                match c {
                    '\\' => match chars.peek().copied() {
                        Some((_, n)) if is_sep(n, seps, filter_crlf) || n == '"' || n == '\'' || n == '\\' => {
                            chars.next();
                            head.push(n);
                        }
                        _ => head.push('\\'),
                    },
                    '"' | '\'' => {
                        let at_boundary = head.is_empty();
                        if !at_boundary {
                            head.push(c);
                        }
                        quote = Some((c, at_boundary));
                    }
                    _ => head.push(c),
                }
            }
        }
    }

    if quote.is_some() {
        // Unclosed quote: take the rest verbatim.
        return (head, String::new());
    }
    if end >= s.len() {
        return (head, String::new());
    }
    let rest: String = s[end..]
        .trim_start_matches(|c: char| is_sep(c, seps, filter_crlf))
        .to_string();
    (head, rest)
}

/// Split `s` into all of its tokens.
pub(crate) fn split_all(s: &str, seps: &[char], filter_crlf: bool) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = s.to_string();
    loop {
        let (head, tail) = split_once(&rest, seps, filter_crlf);
        if !head.is_empty() {
            out.push(head);
        }
        if tail.is_empty() {
            break;
        }
        rest = tail;
    }
    out
}
