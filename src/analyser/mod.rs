//! The parse driver.
//!
//! `run_parse` wires the phases together: ingest, record-cache lookup,
//! shortcut expansion, header match, body dispatch, behaviors, callback
//! dispatch, and cache recording. The body walks the node tree scope by
//! scope; every scope ends when its token no longer matches any of its
//! children or args, handing control back to the parent.

pub(crate) mod handlers;
pub(crate) mod header;

use crate::args::Args;
use crate::argv::Argv;
use crate::command::{Command, ParseInput};
use crate::error::{BuiltinKind, ParseError};
use crate::fuzzy::similarity;
use crate::i18n::LangStore;
use crate::node::{Opt, Subcommand};
use crate::registry::Registry;
use crate::result::{HeadMatch, OptionResult, ParseResult, SubcommandResult};
use crate::shortcut::{self, ShortcutEntry};
use crate::token::{Token, Value};
use handlers::MatchCtx;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

/// Per-scope accumulation.
#[derive(Default)]
struct ScopeOut {
    args: BTreeMap<String, Value>,
    args_done: bool,
    options: BTreeMap<String, OptionResult>,
    subcommands: BTreeMap<String, SubcommandResult>,
}

struct Analyser<'a> {
    cmd: &'a Command,
    registry: &'a Registry,
    param_ids: HashSet<String>,
    /// Candidate next-tokens per active scope, deepest last. Left in
    /// place on error so speculative parses can read the stopping point.
    cand_stack: Vec<Vec<String>>,
    /// Candidates of the most recently completed scope, for speculative
    /// parses that finish without an error.
    latest_candidates: Vec<String>,
}

enum Child<'b> {
    Option(&'b Opt),
    Sub(&'b Subcommand),
}

impl<'a> Analyser<'a> {
    fn process_scope(
        &mut self,
        argv: &mut Argv,
        args: &Args,
        options: &[Opt],
        subcommands: &[Subcommand],
        seps: &[char],
        is_root: bool,
        out: &mut ScopeOut,
    ) -> Result<Option<(BuiltinKind, String)>, ParseError> {
        self.cand_stack.push(Vec::new());
        loop {
            if let Some(top) = self.cand_stack.last_mut() {
                *top = scope_candidates(args, options, subcommands, out);
            }
            if argv.done() {
                break;
            }
            if is_root {
                if let Some(action) = self.try_builtin(argv, args, options, subcommands, out)? {
                    self.pop_scope();
                    return Ok(Some(action));
                }
            }
            if self.try_children(argv, options, subcommands, seps, out)? {
                continue;
            }
            if !out.args_done && !args.is_empty() {
                out.args_done = true;
                let ctx = MatchCtx {
                    param_ids: &self.param_ids,
                };
                out.args = handlers::analyse_args(argv, args, seps, &ctx)?;
                if !out.args.is_empty() {
                    continue;
                }
            }
            break;
        }
        // Args never reached any input: bind defaults or report what is
        // missing.
        if !out.args_done && !args.is_empty() {
            out.args_done = true;
            let ctx = MatchCtx {
                param_ids: &self.param_ids,
            };
            out.args = handlers::analyse_args(argv, args, seps, &ctx)?;
        }
        apply_child_defaults(options, subcommands, out);
        self.pop_scope();
        Ok(None)
    }

    fn pop_scope(&mut self) {
        if let Some(candidates) = self.cand_stack.pop() {
            self.latest_candidates = candidates;
        }
    }

    fn try_children(
        &mut self,
        argv: &mut Argv,
        options: &[Opt],
        subcommands: &[Subcommand],
        seps: &[char],
        out: &mut ScopeOut,
    ) -> Result<bool, ParseError> {
        let mut order: Vec<(std::cmp::Reverse<bool>, std::cmp::Reverse<i32>, usize, Child)> =
            Vec::new();
        for (i, opt) in options.iter().enumerate() {
            order.push((
                std::cmp::Reverse(!opt.requires.is_empty()),
                std::cmp::Reverse(opt.priority),
                i,
                Child::Option(opt),
            ));
        }
        for (i, sub) in subcommands.iter().enumerate() {
            order.push((
                std::cmp::Reverse(!sub.requires.is_empty()),
                std::cmp::Reverse(sub.priority),
                options.len() + i,
                Child::Sub(sub),
            ));
        }
        order.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));
        for (_, _, _, child) in order {
            match child {
                Child::Option(opt) => {
                    let ctx = MatchCtx {
                        param_ids: &self.param_ids,
                    };
                    if handlers::try_option(argv, opt, seps, &ctx, &mut out.options)? {
                        tracing::trace!(option = opt.dest.as_str(), "option matched");
                        return Ok(true);
                    }
                }
                Child::Sub(sub) => {
                    if self.try_subcommand(argv, sub, seps, out)? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn try_subcommand(
        &mut self,
        argv: &mut Argv,
        sub: &Subcommand,
        parent_seps: &[char],
        out: &mut ScopeOut,
    ) -> Result<bool, ParseError> {
        let snap = argv.snapshot();
        if !handlers::match_node_name(argv, &sub.requires, &sub.aliases, parent_seps) {
            argv.restore(snap);
            return Ok(false);
        }
        tracing::trace!(subcommand = sub.dest.as_str(), "subcommand matched");
        let seps: Vec<char> = sub
            .separators
            .clone()
            .unwrap_or_else(|| parent_seps.to_vec());
        let mut inner = ScopeOut::default();
        self.process_scope(
            argv,
            &sub.args,
            &sub.options,
            &sub.subcommands,
            &seps,
            false,
            &mut inner,
        )?;
        let folded = SubcommandResult {
            value: sub.action.on_match(1),
            args: inner.args,
            options: inner.options,
            subcommands: inner.subcommands,
        };
        match out.subcommands.entry(sub.dest.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(folded);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                current.value = folded.value;
                current.args.extend(folded.args);
                current.options.extend(folded.options);
                current.subcommands.extend(folded.subcommands);
            }
        }
        Ok(true)
    }

    fn try_builtin(
        &mut self,
        argv: &mut Argv,
        args: &Args,
        options: &[Opt],
        subcommands: &[Subcommand],
        out: &ScopeOut,
    ) -> Result<Option<(BuiltinKind, String)>, ParseError> {
        let builtins = self.cmd.config().builtins;
        let Some(Token::Text(text)) = argv.peek(None) else {
            return Ok(None);
        };
        match text.as_str() {
            "--help" | "-h" if builtins.help => {
                let _ = argv.next(None);
                argv.drain();
                Ok(Some((BuiltinKind::Help, self.cmd.help_text())))
            }
            "--shortcut" if builtins.shortcut => {
                let _ = argv.next(None);
                let Some(Token::Text(key)) = argv.next(None) else {
                    return Err(ParseError::ArgumentMissing {
                        key: "shortcut key".into(),
                    });
                };
                let template = argv
                    .release(None)
                    .iter()
                    .filter_map(Token::as_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                argv.drain();
                if template.is_empty() {
                    return Err(ParseError::ArgumentMissing {
                        key: "shortcut template".into(),
                    });
                }
                self.registry
                    .add_shortcut(self.cmd.id(), ShortcutEntry::new(key.clone(), template));
                let output =
                    LangStore::default().format("shortcut.registered", &[("key", key)]);
                Ok(Some((BuiltinKind::Shortcut, output)))
            }
            "--comp" | "?" if builtins.completion => {
                let _ = argv.next(None);
                argv.drain();
                let candidates = scope_candidates(args, options, subcommands, out);
                let mut output = LangStore::default().require("completion.prompt").to_string();
                for candidate in candidates {
                    output.push_str(&format!("\n* {candidate}"));
                }
                Ok(Some((BuiltinKind::Completion, output)))
            }
            _ => Ok(None),
        }
    }
}

/// What could legally come next in this scope.
fn scope_candidates(
    args: &Args,
    options: &[Opt],
    subcommands: &[Subcommand],
    out: &ScopeOut,
) -> Vec<String> {
    let mut candidates = Vec::new();
    for opt in options {
        if !out.options.contains_key(&opt.dest) {
            candidates.push(opt.name.clone());
        }
    }
    for sub in subcommands {
        if !out.subcommands.contains_key(&sub.dest) {
            candidates.push(sub.name.clone());
        }
    }
    if !out.args_done {
        for arg in args.slots() {
            if !out.args.contains_key(&arg.name) && !arg.hidden {
                candidates.push(
                    arg.notice
                        .clone()
                        .unwrap_or_else(|| format!("<{}>", arg.name)),
                );
            }
        }
    }
    candidates
}

fn apply_child_defaults(options: &[Opt], subcommands: &[Subcommand], out: &mut ScopeOut) {
    for opt in options {
        if let Some(default) = &opt.default {
            out.options
                .entry(opt.dest.clone())
                .or_insert_with(|| OptionResult {
                    value: default.clone(),
                    args: BTreeMap::new(),
                });
        }
    }
    for sub in subcommands {
        if let Some(default) = &sub.default {
            out.subcommands
                .entry(sub.dest.clone())
                .or_insert_with(|| SubcommandResult {
                    value: default.clone(),
                    ..SubcommandResult::default()
                });
        }
    }
}

fn collect_param_ids(cmd: &Command) -> HashSet<String> {
    fn walk(options: &[Opt], subcommands: &[Subcommand], out: &mut HashSet<String>) {
        for opt in options {
            out.extend(opt.aliases.iter().cloned());
            out.extend(opt.requires.iter().cloned());
        }
        for sub in subcommands {
            out.extend(sub.aliases.iter().cloned());
            out.extend(sub.requires.iter().cloned());
            walk(&sub.options, &sub.subcommands, out);
        }
    }
    let mut out = HashSet::new();
    walk(cmd.options(), cmd.subcommands(), &mut out);
    let builtins = cmd.config().builtins;
    if builtins.help {
        out.insert("--help".into());
        out.insert("-h".into());
    }
    if builtins.shortcut {
        out.insert("--shortcut".into());
    }
    if builtins.completion {
        out.insert("--comp".into());
        out.insert("?".into());
    }
    out
}

fn fail_result(origin: Vec<Token>, head: HeadMatch, error: ParseError) -> ParseResult {
    ParseResult::failed(origin, head, error)
}

fn maybe_fuzzy(cmd: &Command, argv: &Argv, original: ParseError) -> ParseError {
    if !cmd.config().fuzzy_match {
        return original;
    }
    let Some(Token::Text(text)) = argv.peek(None) else {
        return original;
    };
    let mut best: Option<(f64, String)> = None;
    for candidate in cmd.header.candidates() {
        let score = similarity(&text, &candidate);
        if best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((score, candidate));
        }
    }
    match best {
        Some((score, candidate)) if score >= cmd.config().fuzzy_threshold => {
            ParseError::FuzzySuggestion { candidate }
        }
        _ => original,
    }
}

fn export(
    cmd: &Command,
    argv: &Argv,
    head: HeadMatch,
    out: ScopeOut,
    error: Option<ParseError>,
) -> ParseResult {
    let matched = error.is_none();
    let mut result = ParseResult {
        origin: argv.origin().to_vec(),
        matched,
        head,
        main_args: out.args,
        options: out.options,
        subcommands: out.subcommands,
        error_info: error,
        error_data: if matched {
            Vec::new()
        } else {
            argv.release(Some(&cmd.config().separators))
        },
        ..ParseResult::default()
    };
    result.unpack();
    result
}

/// Run one full parse.
pub(crate) fn run_parse(
    cmd: &Command,
    input: ParseInput,
    registry: &Registry,
    speculative: bool,
) -> ParseResult {
    let origin_tokens = input.clone().into_tokens();
    let options = cmd.argv_options.clone();
    let mut argv = match Argv::build(input.into_tokens(), options) {
        Ok(argv) => argv,
        Err(error) => return fail_result(origin_tokens, HeadMatch::default(), error),
    };
    tracing::debug!(command = cmd.name(), "parse started");

    let input_hash = argv.input_hash();
    if !speculative {
        if let Some(hit) = registry.recall(cmd.id(), input_hash) {
            tracing::debug!(command = cmd.name(), "record cache hit");
            return hit;
        }
    }

    // Shortcut expansion precedes header matching.
    if let Some(Token::Text(first)) = argv.peek(None) {
        if let Some(entry) = registry.find_shortcut(cmd.id(), &first) {
            let _ = argv.next(None);
            let remainder = argv.release(None);
            match shortcut::expand(&entry, &remainder, &cmd.config().separators) {
                Ok(mut tokens) => {
                    if entry.prefix {
                        tokens.insert(0, Token::text(cmd.canonical_header()));
                    }
                    tracing::debug!(key = entry.key.as_str(), "shortcut expanded");
                    argv.reload(tokens);
                }
                Err(error) => return fail_result(origin_tokens, HeadMatch::default(), error),
            }
        }
    }

    let head = match header::match_header(&cmd.header, &mut argv) {
        Ok(head) => head,
        Err(error) => {
            let error = maybe_fuzzy(cmd, &argv, error);
            let mut result = fail_result(origin_tokens, HeadMatch::default(), error);
            result.error_data = argv.release(Some(&cmd.config().separators));
            return result;
        }
    };

    let mut analyser = Analyser {
        cmd,
        registry,
        param_ids: collect_param_ids(cmd),
        cand_stack: Vec::new(),
        latest_candidates: Vec::new(),
    };
    let mut out = ScopeOut::default();
    let seps = cmd.config().separators.clone();
    let body = analyser.process_scope(
        &mut argv,
        cmd.args(),
        cmd.options(),
        cmd.subcommands(),
        &seps,
        true,
        &mut out,
    );

    let mut result = match body {
        Ok(Some((kind, output))) => {
            let mut result = export(cmd, &argv, head, out, None);
            result.output = Some(output);
            result.error_info = Some(ParseError::Builtin { kind });
            result
        }
        Ok(None) => {
            if argv.done() {
                export(cmd, &argv, head, out, None)
            } else if cmd.config().strict {
                let token = argv
                    .peek(None)
                    .map(|t| handlers::token_display(&t))
                    .unwrap_or_default();
                let error = ParseError::ParamsUnmatched {
                    token,
                    expected: "end of input".into(),
                };
                export(cmd, &argv, head, out, Some(error))
            } else {
                let extra: Vec<Value> = argv
                    .release(Some(&seps))
                    .iter()
                    .map(|t| match t {
                        Token::Text(s) => Value::Str(s.clone()),
                        Token::Opaque(o) => Value::Opaque(o.clone()),
                    })
                    .collect();
                argv.drain();
                out.args.insert("$extra".into(), Value::List(extra));
                export(cmd, &argv, head, out, None)
            }
        }
        Err(error) => export(cmd, &argv, head, out, Some(error)),
    };

    if speculative {
        result.candidates = analyser
            .cand_stack
            .pop()
            .unwrap_or(analyser.latest_candidates);
    }

    if result.matched && result.error_info.is_none() {
        for behavior in &cmd.behaviors {
            if let Err(err) = behavior.operate(&mut result) {
                tracing::debug!(behavior = behavior.name(), "behavior rejected the result");
                result.matched = false;
                result.error_info = Some(ParseError::Behavior {
                    behavior: behavior.name().to_string(),
                    reason: err.reason,
                });
                break;
            }
        }
    }

    if result.matched && result.error_info.is_none() {
        if let Some(executor) = &cmd.executor {
            if let Err(err) = executor.execute(&result) {
                tracing::warn!(reason = err.reason.as_str(), "executor failed");
            }
        }
    }

    if !speculative && result.matched && result.error_info.is_none() {
        registry.record(cmd.id(), input_hash, result.clone());
    }
    tracing::debug!(command = cmd.name(), matched = result.matched, "parse finished");
    result
}
