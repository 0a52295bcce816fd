//! Typed value predicates and converters.
//!
//! A [`Pattern`] answers one question: does this token denote a value of
//! my target type, and if so, which value? `accept` is a pure function of
//! the token and the pattern; patterns are immutable after construction
//! and freely shareable.

use crate::token::{OpaqueToken, Token, Value};
use regex::Regex;
use std::any::{Any, TypeId};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Post-acceptance predicate. A failing validator turns an accepted value
/// into a mismatch with an "invalid value" reason.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Marker returned when a token does not denote the pattern's target.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// Human-readable description of what was expected.
    pub expected: String,
    /// The token was accepted but a validator refused the value.
    pub invalid: bool,
}

impl Mismatch {
    fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            invalid: false,
        }
    }

    fn invalid(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            invalid: true,
        }
    }
}

#[derive(Clone)]
enum PatternKind {
    /// Accepts any token as-is.
    Any,
    /// Accepts any token, coerced to its display string.
    AnyString,
    /// Accepts string tokens only, unchanged.
    Text,
    Int,
    Float,
    Bool,
    /// String tokens become their UTF-8 bytes; opaque `Vec<u8>` and
    /// `PathBuf` payloads convert too.
    Bytes,
    /// String tokens become an opaque `PathBuf`.
    Path,
    /// Exact equality against a fixed value.
    Literal(Value),
    /// Full-match regex over string tokens.
    Regex(Regex),
    /// First-hit alternation.
    Union(Vec<Pattern>),
    /// Comma-separated elements, each accepted by the inner pattern.
    Sequence(Box<Pattern>),
    /// Comma-separated `key:value` entries, each side accepted by its
    /// pattern.
    Mapping {
        key: Box<Pattern>,
        value: Box<Pattern>,
    },
    /// Inverts the inner pattern; binds the raw token on success.
    Anti(Box<Pattern>),
    /// Opaque tokens of exactly this type.
    Opaque { id: TypeId, name: &'static str },
}

/// A value-matching object: predicate, converter, and validator chain.
#[derive(Clone)]
pub struct Pattern {
    kind: PatternKind,
    validators: Vec<Validator>,
}

impl Pattern {
    pub fn any() -> Self {
        Self::from_kind(PatternKind::Any)
    }

    pub fn any_string() -> Self {
        Self::from_kind(PatternKind::AnyString)
    }

    /// String tokens only; rejects opaque tokens.
    pub fn text() -> Self {
        Self::from_kind(PatternKind::Text)
    }

    pub fn int() -> Self {
        Self::from_kind(PatternKind::Int)
    }

    pub fn float() -> Self {
        Self::from_kind(PatternKind::Float)
    }

    pub fn boolean() -> Self {
        Self::from_kind(PatternKind::Bool)
    }

    pub fn bytes() -> Self {
        Self::from_kind(PatternKind::Bytes)
    }

    pub fn path() -> Self {
        Self::from_kind(PatternKind::Path)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::from_kind(PatternKind::Literal(value.into()))
    }

    pub fn regex(source: &str) -> Result<Self, crate::error::SchemaError> {
        let anchored = format!("^(?:{source})$");
        Ok(Self::from_kind(PatternKind::Regex(Regex::new(&anchored)?)))
    }

    pub fn union(alternatives: Vec<Pattern>) -> Self {
        Self::from_kind(PatternKind::Union(alternatives))
    }

    pub fn sequence(inner: Pattern) -> Self {
        Self::from_kind(PatternKind::Sequence(Box::new(inner)))
    }

    pub fn mapping(key: Pattern, value: Pattern) -> Self {
        Self::from_kind(PatternKind::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn anti(inner: Pattern) -> Self {
        Self::from_kind(PatternKind::Anti(Box::new(inner)))
    }

    /// Matches opaque tokens whose payload type is exactly `T`.
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self::from_kind(PatternKind::Opaque {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        })
    }

    fn from_kind(kind: PatternKind) -> Self {
        Self {
            kind,
            validators: Vec::new(),
        }
    }

    /// Append a post-acceptance predicate.
    pub fn validate(mut self, check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validators.push(Arc::new(check));
        self
    }

    /// Description of the target type, for reflection and error reporting.
    pub fn origin(&self) -> String {
        match &self.kind {
            PatternKind::Any => "any".into(),
            PatternKind::AnyString => "any_str".into(),
            PatternKind::Text => "str".into(),
            PatternKind::Int => "int".into(),
            PatternKind::Float => "float".into(),
            PatternKind::Bool => "bool".into(),
            PatternKind::Bytes => "bytes".into(),
            PatternKind::Path => "path".into(),
            PatternKind::Literal(v) => format!("{v}"),
            PatternKind::Regex(re) => re.as_str().into(),
            PatternKind::Union(alts) => {
                let parts: Vec<String> = alts.iter().map(|p| p.origin()).collect();
                parts.join("|")
            }
            PatternKind::Sequence(inner) => format!("[{}]", inner.origin()),
            PatternKind::Mapping { key, value } => {
                format!("{{{}: {}}}", key.origin(), value.origin())
            }
            PatternKind::Anti(inner) => format!("!{}", inner.origin()),
            PatternKind::Opaque { name, .. } => (*name).into(),
        }
    }

    /// Try to accept and convert a token.
    pub fn accept(&self, token: &Token) -> Result<Value, Mismatch> {
        let value = self.kind.accept(token)?;
        for check in &self.validators {
            if !check(&value) {
                return Err(Mismatch::invalid(format!("valid {}", self.origin())));
            }
        }
        Ok(value)
    }
}

impl PatternKind {
    fn accept(&self, token: &Token) -> Result<Value, Mismatch> {
        match self {
            PatternKind::Any => Ok(raw_value(token)),
            PatternKind::AnyString => Ok(Value::Str(display(token))),
            PatternKind::Text => match token {
                Token::Text(s) => Ok(Value::Str(s.clone())),
                Token::Opaque(_) => Err(Mismatch::new("str")),
            },
            PatternKind::Int => match token {
                Token::Text(s) => s
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| Mismatch::new("int")),
                Token::Opaque(o) => o
                    .downcast_ref::<i64>()
                    .map(|n| Value::Int(*n))
                    .ok_or_else(|| Mismatch::new("int")),
            },
            PatternKind::Float => match token {
                Token::Text(s) => s
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| Mismatch::new("float")),
                Token::Opaque(o) => o
                    .downcast_ref::<f64>()
                    .map(|x| Value::Float(*x))
                    .ok_or_else(|| Mismatch::new("float")),
            },
            PatternKind::Bool => match token {
                Token::Text(s) => match s.to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(Mismatch::new("bool")),
                },
                Token::Opaque(o) => o
                    .downcast_ref::<bool>()
                    .map(|b| Value::Bool(*b))
                    .ok_or_else(|| Mismatch::new("bool")),
            },
            PatternKind::Bytes => match token {
                Token::Text(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
                Token::Opaque(o) => {
                    if let Some(b) = o.downcast_ref::<Vec<u8>>() {
                        Ok(Value::Bytes(b.clone()))
                    } else if let Some(p) = o.downcast_ref::<PathBuf>() {
                        Ok(Value::Bytes(p.display().to_string().into_bytes()))
                    } else {
                        Err(Mismatch::new("bytes"))
                    }
                }
            },
            PatternKind::Path => match token {
                Token::Text(s) => Ok(Value::Opaque(OpaqueToken::new(PathBuf::from(s)))),
                Token::Opaque(o) => {
                    if o.is::<PathBuf>() {
                        Ok(Value::Opaque(o.clone()))
                    } else {
                        Err(Mismatch::new("path"))
                    }
                }
            },
            PatternKind::Literal(expected) => {
                let got = match (token, expected) {
                    (Token::Text(s), Value::Str(v)) if s == v => Some(expected.clone()),
                    (Token::Text(s), Value::Int(v)) if s.parse::<i64>() == Ok(*v) => {
                        Some(expected.clone())
                    }
                    (Token::Text(s), Value::Bool(v))
                        if s.to_ascii_lowercase().parse::<bool>() == Ok(*v) =>
                    {
                        Some(expected.clone())
                    }
                    (Token::Opaque(o), Value::Opaque(v)) if o == v => Some(expected.clone()),
                    _ => None,
                };
                got.ok_or_else(|| Mismatch::new(format!("{expected}")))
            }
            PatternKind::Regex(re) => match token {
                Token::Text(s) if re.is_match(s) => Ok(Value::Str(s.clone())),
                _ => Err(Mismatch::new(re.as_str())),
            },
            PatternKind::Union(alts) => {
                for alt in alts {
                    if let Ok(v) = alt.accept(token) {
                        return Ok(v);
                    }
                }
                let parts: Vec<String> = alts.iter().map(|p| p.origin()).collect();
                Err(Mismatch::new(parts.join("|")))
            }
            PatternKind::Sequence(inner) => match token {
                Token::Text(s) => {
                    let mut items = Vec::new();
                    for part in s.split(',') {
                        let v = inner
                            .accept(&Token::text(part))
                            .map_err(|m| Mismatch::new(format!("[{}]", m.expected)))?;
                        items.push(v);
                    }
                    Ok(Value::List(items))
                }
                Token::Opaque(_) => Err(Mismatch::new("sequence")),
            },
            PatternKind::Mapping { key, value } => match token {
                Token::Text(s) => {
                    let mut map = std::collections::BTreeMap::new();
                    for part in s.split(',') {
                        let Some((k, v)) = part.split_once(':') else {
                            return Err(Mismatch::new("mapping"));
                        };
                        let k = key
                            .accept(&Token::text(k))
                            .map_err(|m| Mismatch::new(format!("{{{}}}", m.expected)))?;
                        let v = value
                            .accept(&Token::text(v))
                            .map_err(|m| Mismatch::new(format!("{{{}}}", m.expected)))?;
                        map.insert(k.to_string(), v);
                    }
                    Ok(Value::Map(map))
                }
                Token::Opaque(_) => Err(Mismatch::new("mapping")),
            },
            PatternKind::Anti(inner) => match inner.accept(token) {
                Ok(_) => Err(Mismatch::new(format!("!{}", inner.origin()))),
                Err(_) => Ok(raw_value(token)),
            },
            PatternKind::Opaque { id, name } => match token {
                Token::Opaque(o) if o.type_id() == *id => Ok(Value::Opaque(o.clone())),
                _ => Err(Mismatch::new(*name)),
            },
        }
    }
}

fn raw_value(token: &Token) -> Value {
    match token {
        Token::Text(s) => Value::Str(s.clone()),
        Token::Opaque(o) => Value::Opaque(o.clone()),
    }
}

fn display(token: &Token) -> String {
    match token {
        Token::Text(s) => s.clone(),
        Token::Opaque(o) => format!("<{}>", o.type_name()),
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({})", self.origin())?;
        if !self.validators.is_empty() {
            write!(f, "+{} validators", self.validators.len())?;
        }
        Ok(())
    }
}

impl PartialEq for Pattern {
    /// Structural equality over the pattern shape; validator chains are
    /// opaque functions and compare by length only.
    fn eq(&self, other: &Self) -> bool {
        self.origin() == other.origin() && self.validators.len() == other.validators.len()
    }
}
