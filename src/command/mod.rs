//! The command root: header, args, children, and configuration.

use crate::analyser::header::{self, CompiledHeader};
use crate::args::Args;
use crate::argv::ArgvOptions;
use crate::behavior::Behavior;
use crate::error::{ParseError, SchemaError};
use crate::executor::{AsyncExecutor, BoxFuture, ExecuteError, Executor};
use crate::node::{Opt, Subcommand};
use crate::registry::Registry;
use crate::result::ParseResult;
use crate::shortcut::ShortcutEntry;
use crate::token::{OpaqueToken, Token, Value};
use serde::Deserialize;
use std::any::{Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Which built-in options stay enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Builtins {
    pub help: bool,
    pub shortcut: bool,
    pub completion: bool,
}

impl Default for Builtins {
    fn default() -> Self {
        Self {
            help: true,
            shortcut: true,
            completion: true,
        }
    }
}

/// Per-command configuration.
#[derive(Clone, Debug)]
pub struct CommandConfig {
    /// Token boundary characters for string input.
    pub separators: Vec<char>,
    /// Suggest near-miss entries on header mismatch.
    pub fuzzy_match: bool,
    /// Similarity ratio a suggestion must reach.
    pub fuzzy_threshold: f64,
    /// Allow header-and-first-token concatenation at the root.
    pub compact: bool,
    /// Reject extra tokens instead of collecting them under `$extra`.
    pub strict: bool,
    /// Make `try_parse` return fatal errors instead of an unmatched result.
    pub raise_error: bool,
    pub builtins: Builtins,
    /// Registry grouping tag.
    pub namespace: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            separators: vec![' '],
            fuzzy_match: false,
            fuzzy_threshold: 0.6,
            compact: false,
            strict: true,
            raise_error: false,
            builtins: Builtins::default(),
            namespace: "main".to_string(),
        }
    }
}

/// Named bundle of defaults applied to commands built under it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Separator characters, as a string.
    #[serde(default)]
    pub separators: Option<String>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub fuzzy_match: Option<bool>,
}

/// A header prefix: literal text, or an opaque token type.
#[derive(Clone, Debug)]
pub enum Prefix {
    Text(String),
    Type { id: TypeId, name: &'static str },
}

/// Raw parse input: a single string, or a heterogeneous token sequence.
#[derive(Clone, Debug)]
pub enum ParseInput {
    Text(String),
    Tokens(Vec<Token>),
}

impl ParseInput {
    pub(crate) fn into_tokens(self) -> Vec<Token> {
        match self {
            ParseInput::Text(s) => vec![Token::Text(s)],
            ParseInput::Tokens(tokens) => tokens,
        }
    }
}

impl From<&str> for ParseInput {
    fn from(s: &str) -> Self {
        ParseInput::Text(s.to_string())
    }
}

impl From<String> for ParseInput {
    fn from(s: String) -> Self {
        ParseInput::Text(s)
    }
}

impl From<Vec<Token>> for ParseInput {
    fn from(tokens: Vec<Token>) -> Self {
        ParseInput::Tokens(tokens)
    }
}

/// An immutable command schema. Build once, share freely, parse many times.
#[derive(Clone)]
pub struct Command {
    name: String,
    prefixes: Vec<Prefix>,
    args: Args,
    options: Vec<Opt>,
    subcommands: Vec<Subcommand>,
    config: CommandConfig,
    pub(crate) header: CompiledHeader,
    pub(crate) argv_options: ArgvOptions,
    pub(crate) behaviors: Vec<Arc<dyn Behavior>>,
    pub(crate) executor: Option<Arc<dyn Executor>>,
    pub(crate) async_executor: Option<Arc<dyn AsyncExecutor>>,
    id: u64,
}

impl Command {
    pub fn new(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            prefixes: Vec::new(),
            args: Args::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
            config: CommandConfig::default(),
            argv_options: ArgvOptions::default(),
            behaviors: Vec::new(),
            executor: None,
            async_executor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn options(&self) -> &[Opt] {
        &self.options
    }

    pub fn subcommands(&self) -> &[Subcommand] {
        &self.subcommands
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// Stable identity derived from the schema; keys the record cache and
    /// the shortcut store.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Parse against the process-wide default registry.
    pub fn parse(&self, input: impl Into<ParseInput>) -> ParseResult {
        self.parse_with(input, Registry::global())
    }

    /// Parse using an explicit registry.
    pub fn parse_with(&self, input: impl Into<ParseInput>, registry: &Registry) -> ParseResult {
        crate::analyser::run_parse(self, input.into(), registry, false)
    }

    /// Parse, honoring `raise_error`: fatal errors become `Err` instead of
    /// an unmatched result.
    pub fn try_parse(&self, input: impl Into<ParseInput>) -> Result<ParseResult, ParseError> {
        let result = self.parse(input);
        if self.config.raise_error {
            if let Some(error) = &result.error_info {
                if !error.is_clean() {
                    return Err(error.clone());
                }
            }
        }
        Ok(result)
    }

    /// Register a shortcut for this command in the default registry.
    pub fn shortcut(&self, entry: ShortcutEntry) {
        Registry::global().add_shortcut(self.id, entry);
    }

    /// Start the bound async executor, if any. The caller awaits the
    /// returned future; the parse itself never blocks on it.
    pub fn dispatch_async<'a>(
        &'a self,
        result: &'a ParseResult,
    ) -> Option<BoxFuture<'a, Result<Value, ExecuteError>>> {
        self.async_executor.as_ref().map(|e| e.execute(result))
    }

    /// Canonical entry spelling, used by prefixed shortcuts and help.
    pub fn canonical_header(&self) -> String {
        self.header
            .candidates()
            .into_iter()
            .next()
            .unwrap_or_else(|| self.name.clone())
    }

    /// Minimal usage text for the built-in help option.
    pub fn help_text(&self) -> String {
        let mut out = String::new();
        let mut usage = format!("Usage: {}", self.canonical_header());
        for arg in self.args.slots() {
            if arg.hidden {
                continue;
            }
            if arg.skippable() {
                usage.push_str(&format!(" [{}]", arg.name));
            } else {
                usage.push_str(&format!(" <{}>", arg.name));
            }
        }
        out.push_str(&usage);
        if !self.options.is_empty() {
            out.push_str("\nOptions:");
            for opt in &self.options {
                let aliases = opt.aliases.join(", ");
                match &opt.help {
                    Some(help) => out.push_str(&format!("\n  {aliases}  {help}")),
                    None => out.push_str(&format!("\n  {aliases}")),
                }
            }
        }
        if !self.subcommands.is_empty() {
            out.push_str("\nSubcommands:");
            for sub in &self.subcommands {
                match &sub.help {
                    Some(help) => out.push_str(&format!("\n  {}  {help}", sub.name)),
                    None => out.push_str(&format!("\n  {}", sub.name)),
                }
            }
        }
        out
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("options", &self.options.len())
            .field("subcommands", &self.subcommands.len())
            .field("namespace", &self.config.namespace)
            .finish()
    }
}

/// Builder collecting schema parts before header compilation.
pub struct CommandBuilder {
    name: String,
    prefixes: Vec<Prefix>,
    args: Args,
    options: Vec<Opt>,
    subcommands: Vec<Subcommand>,
    config: CommandConfig,
    argv_options: ArgvOptions,
    behaviors: Vec<Arc<dyn Behavior>>,
    executor: Option<Arc<dyn Executor>>,
    async_executor: Option<Arc<dyn AsyncExecutor>>,
}

impl CommandBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(Prefix::Text(prefix.into()));
        self
    }

    /// Accept an opaque token of type `T` as a header prefix.
    pub fn opaque_prefix<T: Any + Send + Sync>(mut self) -> Self {
        self.prefixes.push(Prefix::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        });
        self
    }

    pub fn args(mut self, args: Args) -> Self {
        self.args = args;
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

    pub fn config(mut self, config: CommandConfig) -> Self {
        self.config = config;
        self
    }

    pub fn separators(mut self, seps: impl IntoIterator<Item = char>) -> Self {
        self.config.separators = seps.into_iter().collect();
        self
    }

    pub fn fuzzy(mut self) -> Self {
        self.config.fuzzy_match = true;
        self
    }

    pub fn compact(mut self) -> Self {
        self.config.compact = true;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn raise_error(mut self) -> Self {
        self.config.raise_error = true;
        self
    }

    pub fn builtins(mut self, builtins: Builtins) -> Self {
        self.config.builtins = builtins;
        self
    }

    /// Apply a namespace's defaults; explicit builder calls afterwards
    /// still override.
    pub fn in_namespace(mut self, ns: &Namespace) -> Self {
        self.config.namespace = ns.name.clone();
        for prefix in &ns.prefixes {
            self.prefixes.push(Prefix::Text(prefix.clone()));
        }
        if let Some(seps) = &ns.separators {
            self.config.separators = seps.chars().collect();
        }
        if let Some(strict) = ns.strict {
            self.config.strict = strict;
        }
        if let Some(fuzzy) = ns.fuzzy_match {
            self.config.fuzzy_match = fuzzy;
        }
        self
    }

    /// Transform opaque tokens of type `T` during ingest. Returning `None`
    /// drops the token.
    pub fn preprocess<T: Any + Send + Sync>(
        mut self,
        transform: impl Fn(&OpaqueToken) -> Option<Token> + Send + Sync + 'static,
    ) -> Self {
        self.argv_options
            .preprocessors
            .insert(TypeId::of::<T>(), Arc::new(transform));
        self
    }

    /// Drop opaque tokens of type `T` from the input before matching.
    pub fn filter_out<T: Any + Send + Sync>(mut self) -> Self {
        self.argv_options.filter_out.insert(TypeId::of::<T>());
        self
    }

    pub fn behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    pub fn on_execute(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn on_execute_async(mut self, executor: impl AsyncExecutor + 'static) -> Self {
        self.async_executor = Some(Arc::new(executor));
        self
    }

    pub fn build(self) -> Result<Command, SchemaError> {
        let header = header::compile(&self.prefixes, &self.name, self.config.compact)?;
        let id = schema_id(&self);
        let mut argv_options = self.argv_options;
        argv_options.separators = self.config.separators.clone();
        argv_options.filter_crlf = true;
        Ok(Command {
            name: self.name,
            prefixes: self.prefixes,
            args: self.args,
            options: self.options,
            subcommands: self.subcommands,
            config: self.config,
            header,
            argv_options,
            behaviors: self.behaviors,
            executor: self.executor,
            async_executor: self.async_executor,
            id,
        })
    }
}

fn describe_sub(sub: &Subcommand, out: &mut String) {
    out.push_str(&format!(
        "sub:{}|{}|{}",
        sub.aliases.join(","),
        sub.requires.join(","),
        sub.args.len()
    ));
    for opt in &sub.options {
        out.push_str(&format!("opt:{}|{}", opt.aliases.join(","), opt.args.len()));
    }
    for inner in &sub.subcommands {
        describe_sub(inner, out);
    }
}

/// Stable schema fingerprint. Two structurally identical commands share an
/// id; any schema change produces a new one, invalidating cached records.
fn schema_id(builder: &CommandBuilder) -> u64 {
    let mut desc = String::new();
    desc.push_str(&builder.name);
    for prefix in &builder.prefixes {
        match prefix {
            Prefix::Text(s) => desc.push_str(&format!("p:{s}")),
            Prefix::Type { name, .. } => desc.push_str(&format!("t:{name}")),
        }
    }
    for arg in builder.args.slots() {
        desc.push_str(&format!("a:{}|{:?}", arg.name, arg.value));
    }
    for opt in &builder.options {
        desc.push_str(&format!("opt:{}|{}", opt.aliases.join(","), opt.args.len()));
    }
    for sub in &builder.subcommands {
        describe_sub(sub, &mut desc);
    }
    desc.push_str(&format!(
        "c:{:?}|{}|{}|{}",
        builder.config.separators,
        builder.config.strict,
        builder.config.compact,
        builder.config.namespace,
    ));
    let mut hasher = DefaultHasher::new();
    desc.hash(&mut hasher);
    hasher.finish()
}
