//! Argument slot schema.
//!
//! [`Args`] is an ordered list of typed slots. Slot order is binding for
//! positionals; keyword slots may be satisfied in any input order once the
//! positionals before them are exhausted. Construction validates the
//! variadic and keyword invariants up front so the matcher never has to.

use crate::error::SchemaError;
use crate::pattern::Pattern;
use crate::token::Value;
use std::fmt;
use std::sync::Arc;

/// Multiplicity marker for variadic slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariadicKind {
    /// Zero or more matches (`*`).
    ZeroOrMore,
    /// At least one match (`+`).
    OneOrMore,
}

/// What a slot consumes and how.
#[derive(Clone, Debug)]
pub enum ArgValue {
    /// One token accepted by the pattern.
    Single(Pattern),
    /// Greedily repeated tokens, optionally capped.
    Variadic {
        pattern: Pattern,
        kind: VariadicKind,
        cap: Option<usize>,
    },
    /// `key<sep>value` (or `key value`) form.
    Keyword {
        key: String,
        sep: char,
        pattern: Pattern,
    },
    /// Any number of `key<sep>value` tokens collected into a map.
    KeywordVariadic {
        sep: char,
        pattern: Pattern,
        kind: VariadicKind,
    },
    /// Everything left in the current scope, unsplit semantics aside.
    Rest,
}

/// Default for a skipped or absent slot.
#[derive(Clone)]
pub enum ArgDefault {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl ArgDefault {
    pub fn get(&self) -> Value {
        match self {
            ArgDefault::Value(v) => v.clone(),
            ArgDefault::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for ArgDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgDefault::Value(v) => write!(f, "{v:?}"),
            ArgDefault::Factory(_) => write!(f, "<factory>"),
        }
    }
}

/// A single argument slot.
#[derive(Clone, Debug)]
pub struct Arg {
    pub name: String,
    pub value: ArgValue,
    pub optional: bool,
    /// Hidden from help output; still bound normally.
    pub hidden: bool,
    /// Invert the pattern: match iff the pattern rejects, bind the raw token.
    pub anti: bool,
    pub default: Option<ArgDefault>,
    /// Separator override for this slot only.
    pub separators: Option<Vec<char>>,
    /// Short annotation shown in help.
    pub notice: Option<String>,
}

impl Arg {
    pub fn new(name: impl Into<String>, pattern: Pattern) -> Self {
        Self::with_value(name, ArgValue::Single(pattern))
    }

    pub fn variadic(name: impl Into<String>, pattern: Pattern, kind: VariadicKind) -> Self {
        Self::with_value(
            name,
            ArgValue::Variadic {
                pattern,
                kind,
                cap: None,
            },
        )
    }

    /// Keyword slot whose literal key is the slot name, `key=value` form.
    pub fn keyword(name: impl Into<String>, pattern: Pattern) -> Self {
        let name = name.into();
        Self::with_value(
            name.clone(),
            ArgValue::Keyword {
                key: name,
                sep: '=',
                pattern,
            },
        )
    }

    pub fn keyword_variadic(name: impl Into<String>, pattern: Pattern, kind: VariadicKind) -> Self {
        Self::with_value(
            name,
            ArgValue::KeywordVariadic {
                sep: '=',
                pattern,
                kind,
            },
        )
    }

    /// Slot that swallows all remaining input of its scope.
    pub fn rest(name: impl Into<String>) -> Self {
        Self::with_value(name, ArgValue::Rest)
    }

    fn with_value(name: impl Into<String>, value: ArgValue) -> Self {
        Self {
            name: name.into(),
            value,
            optional: false,
            hidden: false,
            anti: false,
            default: None,
            separators: None,
            notice: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn anti(mut self) -> Self {
        self.anti = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(ArgDefault::Value(value.into()));
        self
    }

    pub fn default_with(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(ArgDefault::Factory(Arc::new(factory)));
        self
    }

    pub fn separators(mut self, seps: impl IntoIterator<Item = char>) -> Self {
        self.separators = Some(seps.into_iter().collect());
        self
    }

    pub fn notice(mut self, text: impl Into<String>) -> Self {
        self.notice = Some(text.into());
        self
    }

    /// Cap a variadic slot's repetition count.
    pub fn capped(mut self, cap: usize) -> Self {
        if let ArgValue::Variadic { cap: c, .. } = &mut self.value {
            *c = Some(cap);
        }
        self
    }

    /// Override the key/value separator of a keyword slot.
    pub fn key_sep(mut self, sep: char) -> Self {
        match &mut self.value {
            ArgValue::Keyword { sep: s, .. } | ArgValue::KeywordVariadic { sep: s, .. } => *s = sep,
            _ => {}
        }
        self
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self.value,
            ArgValue::Keyword { .. } | ArgValue::KeywordVariadic { .. }
        )
    }

    pub fn is_variadic(&self) -> bool {
        matches!(
            self.value,
            ArgValue::Variadic { .. } | ArgValue::KeywordVariadic { .. }
        )
    }

    /// Whether skipping this slot is recoverable: it is optional, carries a
    /// default, or matches zero tokens legally.
    pub(crate) fn skippable(&self) -> bool {
        self.optional
            || self.default.is_some()
            || matches!(
                self.value,
                ArgValue::Variadic {
                    kind: VariadicKind::ZeroOrMore,
                    ..
                } | ArgValue::KeywordVariadic {
                    kind: VariadicKind::ZeroOrMore,
                    ..
                }
            )
    }
}

/// Ordered, validated sequence of argument slots.
#[derive(Clone, Debug, Default)]
pub struct Args {
    slots: Vec<Arg>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from slots, enforcing the schema invariants.
    pub fn try_new(slots: Vec<Arg>) -> Result<Self, SchemaError> {
        let mut seen = std::collections::HashSet::new();
        let mut variadic: Option<&str> = None;
        let mut var_keyword: Option<&str> = None;
        let last = slots.len().saturating_sub(1);
        for (i, arg) in slots.iter().enumerate() {
            if arg.name.is_empty() {
                return Err(SchemaError::NameEmpty);
            }
            if arg.name.starts_with('$') {
                return Err(SchemaError::ReservedSlot(arg.name.clone()));
            }
            if !seen.insert(arg.name.clone()) {
                return Err(SchemaError::DuplicateSlot(arg.name.clone()));
            }
            match &arg.value {
                ArgValue::Variadic { .. } => {
                    if variadic.is_some() {
                        return Err(SchemaError::MultipleVariadic(arg.name.clone()));
                    }
                    variadic = Some(&arg.name);
                }
                ArgValue::KeywordVariadic { .. } => {
                    if var_keyword.is_some() {
                        return Err(SchemaError::MultipleVariadicKeyword(arg.name.clone()));
                    }
                    var_keyword = Some(&arg.name);
                }
                ArgValue::Rest => {
                    if i != last {
                        return Err(SchemaError::RestNotLast(arg.name.clone()));
                    }
                }
                _ => {}
            }
        }
        Ok(Self { slots })
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Arg] {
        &self.slots
    }

    pub fn keyword_slots(&self) -> impl Iterator<Item = &Arg> {
        self.slots.iter().filter(|a| a.is_keyword())
    }

    /// Count of slots that may legally bind nothing.
    pub fn optional_count(&self) -> usize {
        self.slots.iter().filter(|a| a.skippable()).count()
    }

    /// Whether at least one slot must bind input for the scope to succeed.
    pub fn any_required(&self) -> bool {
        self.slots.iter().any(|a| !a.skippable())
    }
}

impl TryFrom<Vec<Arg>> for Args {
    type Error = SchemaError;

    fn try_from(slots: Vec<Arg>) -> Result<Self, Self::Error> {
        Self::try_new(slots)
    }
}
