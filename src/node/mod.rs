//! Grammar nodes: options and subcommands.
//!
//! Node names follow the `"sentence words name|alias"` convention: leading
//! space-separated words form the required sentence prefix, pipes in the
//! last word declare aliases. The longest alias becomes the canonical name
//! and the dest is that name stripped of leading dashes.

use crate::args::Args;
use crate::error::SchemaError;
use crate::token::Value;

/// How repeated matches of a node fold into its accumulated value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Action {
    /// Last write wins.
    #[default]
    Store,
    /// Fixed constant from the schema.
    StoreValue(Value),
    StoreTrue,
    StoreFalse,
    /// Ordered list of all matched values.
    Append,
    /// Integer count of matches; also unlocks clustered short repetition
    /// (`-vvv`).
    Count,
}

impl Action {
    /// Value recorded for a single match carrying no args.
    pub(crate) fn on_match(&self, repeats: i64) -> Value {
        match self {
            Action::Store => Value::None,
            Action::StoreValue(v) => v.clone(),
            Action::StoreTrue => Value::Bool(true),
            Action::StoreFalse => Value::Bool(false),
            Action::Append => Value::None,
            Action::Count => Value::Int(repeats),
        }
    }
}

fn split_name(raw: &str) -> Result<(Vec<String>, Vec<String>), SchemaError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SchemaError::NameEmpty);
    }
    let mut parts: Vec<&str> = raw.split_whitespace().collect();
    let last = parts.pop().unwrap_or_default();
    let requires: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
    let mut aliases: Vec<String> = last.split('|').map(|s| s.to_string()).collect();
    if aliases.iter().any(|a| a.is_empty()) {
        return Err(SchemaError::NameInvalid(raw.to_string()));
    }
    // Longest alias is canonical so `-u|--upgrade` dests to "upgrade".
    aliases.sort_by_key(|a| std::cmp::Reverse(a.len()));
    Ok((requires, aliases))
}

fn dest_of(canonical: &str) -> String {
    canonical.trim_start_matches('-').to_string()
}

/// A leaf node: matches its name (or an alias) and then its args.
#[derive(Clone, Debug)]
pub struct Opt {
    /// Canonical name, dashes included.
    pub name: String,
    /// All aliases, canonical first.
    pub aliases: Vec<String>,
    /// Sentence: literal tokens that must precede the name.
    pub requires: Vec<String>,
    pub args: Args,
    pub action: Action,
    pub priority: i32,
    /// Allow the first arg to abut the name with no separator (`-f1`).
    pub compact: bool,
    /// Value recorded when the option is absent from the input.
    pub default: Option<Value>,
    pub help: Option<String>,
    /// Key under which results are stored.
    pub dest: String,
}

impl Opt {
    pub fn new(name: &str) -> Result<Self, SchemaError> {
        let (requires, aliases) = split_name(name)?;
        let canonical = aliases[0].clone();
        Ok(Self {
            dest: dest_of(&canonical),
            name: canonical,
            aliases,
            requires,
            args: Args::new(),
            action: Action::Store,
            priority: 0,
            compact: false,
            default: None,
            help: None,
        })
    }

    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = dest.into();
        self
    }
}

/// An internal node: an option that owns nested options and subcommands.
#[derive(Clone, Debug)]
pub struct Subcommand {
    pub name: String,
    pub aliases: Vec<String>,
    pub requires: Vec<String>,
    pub args: Args,
    pub action: Action,
    pub priority: i32,
    pub default: Option<Value>,
    pub help: Option<String>,
    pub dest: String,
    /// Separators inherited by the nested scope.
    pub separators: Option<Vec<char>>,
    pub options: Vec<Opt>,
    pub subcommands: Vec<Subcommand>,
}

impl Subcommand {
    pub fn new(name: &str) -> Result<Self, SchemaError> {
        let (requires, aliases) = split_name(name)?;
        let canonical = aliases[0].clone();
        Ok(Self {
            dest: dest_of(&canonical),
            name: canonical,
            aliases,
            requires,
            args: Args::new(),
            action: Action::Store,
            priority: 0,
            default: None,
            help: None,
            separators: None,
            options: Vec::new(),
            subcommands: Vec::new(),
        })
    }

    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn option(mut self, option: Opt) -> Self {
        self.options.push(option);
        self
    }

    pub fn subcommand(mut self, sub: Subcommand) -> Self {
        self.subcommands.push(sub);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn separators(mut self, seps: impl IntoIterator<Item = char>) -> Self {
        self.separators = Some(seps.into_iter().collect());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = dest.into();
        self
    }
}
