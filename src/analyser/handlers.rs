//! Args consumption and option matching.
//!
//! Every function here leaves the cursor untouched on a soft no-match and
//! committed on success; fatal errors bubble up with the cursor wherever
//! the failure was observed, since the caller exports the leftover stream
//! for diagnostics.

use crate::args::{Arg, ArgValue, Args, VariadicKind};
use crate::argv::Argv;
use crate::error::ParseError;
use crate::node::{Action, Opt};
use crate::pattern::{Mismatch, Pattern};
use crate::result::OptionResult;
use crate::token::{Token, Value};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

/// Shared read-only state of one parse.
pub(crate) struct MatchCtx<'a> {
    /// Every node name and alias known to the command, plus enabled
    /// built-in names. Args consumption yields to these.
    pub param_ids: &'a HashSet<String>,
}

pub(crate) fn token_display(token: &Token) -> String {
    match token {
        Token::Text(s) => s.clone(),
        Token::Opaque(o) => format!("<{}>", o.type_name()),
    }
}

fn raw_value(token: &Token) -> Value {
    match token {
        Token::Text(s) => Value::Str(s.clone()),
        Token::Opaque(o) => Value::Opaque(o.clone()),
    }
}

/// Run a slot's pattern over a token, honoring the `anti` flag.
fn accept(arg: &Arg, pattern: &Pattern, token: &Token) -> Result<Value, Mismatch> {
    if arg.anti {
        match pattern.accept(token) {
            Ok(_) => Err(Mismatch {
                expected: format!("!{}", pattern.origin()),
                invalid: false,
            }),
            Err(_) => Ok(raw_value(token)),
        }
    } else {
        pattern.accept(token)
    }
}

fn mismatch_error(arg: &Arg, token: &Token, mismatch: Mismatch) -> ParseError {
    if mismatch.invalid {
        ParseError::InvalidParam {
            slot: arg.name.clone(),
            reason: mismatch.expected,
        }
    } else {
        ParseError::ParamsUnmatched {
            token: token_display(token),
            expected: mismatch.expected,
        }
    }
}

/// Bind a slot that got no input: default, legal emptiness, or an error.
fn bind_missing(arg: &Arg, result: &mut BTreeMap<String, Value>) -> Result<(), ParseError> {
    if let Some(default) = &arg.default {
        result.insert(arg.name.clone(), default.get());
        return Ok(());
    }
    match &arg.value {
        ArgValue::Variadic {
            kind: VariadicKind::ZeroOrMore,
            ..
        } => {
            result.insert(arg.name.clone(), Value::List(Vec::new()));
            Ok(())
        }
        ArgValue::KeywordVariadic {
            kind: VariadicKind::ZeroOrMore,
            ..
        } => {
            result.insert(arg.name.clone(), Value::Map(BTreeMap::new()));
            Ok(())
        }
        _ if arg.optional => Ok(()),
        ArgValue::Keyword { key, .. } => Err(ParseError::ArgumentMissing { key: key.clone() }),
        _ => Err(ParseError::ParamsMissing {
            slot: arg.name.clone(),
        }),
    }
}

/// Does `text` start with `key` followed by `sep`? Returns the inline
/// value part, which may be empty (value then comes from the next token).
fn kw_split<'t>(text: &'t str, key: &str, sep: char) -> Option<&'t str> {
    text.strip_prefix(key)?.strip_prefix(sep)
}

/// Consume the argv according to the slot schema.
///
/// Slots are processed in definition order; runs of consecutive keyword
/// slots form a pool satisfiable in any input order. Tokens equal to a
/// known node name interrupt consumption unless the current slot is
/// required, in which case the slot binds the token anyway.
pub(crate) fn analyse_args(
    argv: &mut Argv,
    args: &Args,
    scope_seps: &[char],
    ctx: &MatchCtx,
) -> Result<BTreeMap<String, Value>, ParseError> {
    let mut result = BTreeMap::new();
    let kw_keys: Vec<(String, char)> = args
        .keyword_slots()
        .filter_map(|a| match &a.value {
            ArgValue::Keyword { key, sep, .. } => Some((key.clone(), *sep)),
            _ => None,
        })
        .collect();

    let slots = args.slots();
    let mut i = 0;
    while i < slots.len() {
        let arg = &slots[i];
        if matches!(arg.value, ArgValue::Keyword { .. }) {
            let mut pool: Vec<&Arg> = Vec::new();
            while i < slots.len() && matches!(slots[i].value, ArgValue::Keyword { .. }) {
                pool.push(&slots[i]);
                i += 1;
            }
            keyword_pool(argv, pool, scope_seps, ctx, &mut result)?;
            continue;
        }
        positional(argv, arg, scope_seps, ctx, &kw_keys, &mut result)?;
        i += 1;
    }
    Ok(result)
}

fn keyword_pool(
    argv: &mut Argv,
    mut pool: Vec<&Arg>,
    scope_seps: &[char],
    ctx: &MatchCtx,
    result: &mut BTreeMap<String, Value>,
) -> Result<(), ParseError> {
    while !pool.is_empty() {
        let Some(Token::Text(text)) = argv.peek(Some(scope_seps)) else {
            break;
        };
        if ctx.param_ids.contains(&text) {
            break;
        }
        let mut hit = None;
        for (idx, slot) in pool.iter().enumerate() {
            if let ArgValue::Keyword { key, sep, pattern } = &slot.value {
                if let Some(inline) = kw_split(&text, key, *sep) {
                    hit = Some((idx, inline.to_string(), pattern.clone(), key.clone()));
                    break;
                }
            }
        }
        let Some((idx, inline, pattern, key)) = hit else {
            break;
        };
        let snap = argv.snapshot();
        let seps: Vec<char> = pool[idx]
            .separators
            .clone()
            .unwrap_or_else(|| scope_seps.to_vec());
        let _ = argv.next(Some(scope_seps));
        let value_token = if inline.is_empty() {
            match argv.next(Some(&seps)) {
                Some(t) => t,
                None => return Err(ParseError::ArgumentMissing { key }),
            }
        } else {
            Token::text(inline)
        };
        let slot = pool[idx];
        match accept(slot, &pattern, &value_token) {
            Ok(value) => {
                result.insert(slot.name.clone(), value);
                pool.remove(idx);
            }
            Err(mismatch) => {
                if slot.skippable() {
                    argv.restore(snap);
                    break;
                }
                return Err(mismatch_error(slot, &value_token, mismatch));
            }
        }
    }
    for slot in pool {
        bind_missing(slot, result)?;
    }
    Ok(())
}

fn positional(
    argv: &mut Argv,
    arg: &Arg,
    scope_seps: &[char],
    ctx: &MatchCtx,
    kw_keys: &[(String, char)],
    result: &mut BTreeMap<String, Value>,
) -> Result<(), ParseError> {
    let seps: Vec<char> = arg
        .separators
        .clone()
        .unwrap_or_else(|| scope_seps.to_vec());
    match &arg.value {
        ArgValue::Single(pattern) => {
            let Some(token) = argv.peek(Some(&seps)) else {
                return bind_missing(arg, result);
            };
            if let Token::Text(text) = &token {
                if ctx.param_ids.contains(text) && arg.skippable() {
                    return bind_missing(arg, result);
                }
            }
            match accept(arg, pattern, &token) {
                Ok(value) => {
                    let _ = argv.next(Some(&seps));
                    result.insert(arg.name.clone(), value);
                    Ok(())
                }
                Err(mismatch) => {
                    if arg.skippable() {
                        return bind_missing(arg, result);
                    }
                    Err(mismatch_error(arg, &token, mismatch))
                }
            }
        }
        ArgValue::Variadic { pattern, kind, cap } => {
            let cap = cap.unwrap_or(usize::MAX);
            let mut items = Vec::new();
            while items.len() < cap {
                let Some(token) = argv.peek(Some(&seps)) else {
                    break;
                };
                if let Token::Text(text) = &token {
                    if ctx.param_ids.contains(text) {
                        break;
                    }
                    if kw_keys
                        .iter()
                        .any(|(key, sep)| kw_split(text, key, *sep).is_some())
                    {
                        break;
                    }
                }
                match accept(arg, pattern, &token) {
                    Ok(value) => {
                        let _ = argv.next(Some(&seps));
                        items.push(value);
                    }
                    Err(_) => break,
                }
            }
            if items.is_empty() {
                if *kind == VariadicKind::OneOrMore && !arg.optional && arg.default.is_none() {
                    return Err(ParseError::ParamsMissing {
                        slot: arg.name.clone(),
                    });
                }
                return bind_missing(arg, result);
            }
            result.insert(arg.name.clone(), Value::List(items));
            Ok(())
        }
        ArgValue::KeywordVariadic { sep, pattern, kind } => {
            let mut map = BTreeMap::new();
            loop {
                let Some(Token::Text(text)) = argv.peek(Some(&seps)) else {
                    break;
                };
                if ctx.param_ids.contains(&text) {
                    break;
                }
                let Some((key, value_str)) = text.split_once(*sep) else {
                    break;
                };
                if key.is_empty() || value_str.is_empty() {
                    break;
                }
                match accept(arg, pattern, &Token::text(value_str)) {
                    Ok(value) => {
                        let _ = argv.next(Some(&seps));
                        map.insert(key.to_string(), value);
                    }
                    Err(_) => break,
                }
            }
            if map.is_empty() {
                if *kind == VariadicKind::OneOrMore && !arg.optional && arg.default.is_none() {
                    return Err(ParseError::ParamsMissing {
                        slot: arg.name.clone(),
                    });
                }
                return bind_missing(arg, result);
            }
            result.insert(arg.name.clone(), Value::Map(map));
            Ok(())
        }
        ArgValue::Keyword { .. } => {
            // Unreachable from analyse_args; treated as a one-slot pool.
            keyword_pool(argv, vec![arg], scope_seps, ctx, result)
        }
        ArgValue::Rest => {
            let items: Vec<Value> = argv
                .release(Some(&seps))
                .iter()
                .map(raw_value)
                .collect();
            argv.drain();
            result.insert(arg.name.clone(), Value::List(items));
            Ok(())
        }
    }
}

/// Consume an option's sentence and name. Returns the match multiplier
/// (1 normally, the repetition count for clustered count options), or
/// `None` without restoring the cursor — callers hold the snapshot.
pub(crate) fn match_opt_name(argv: &mut Argv, opt: &Opt, seps: &[char]) -> Option<i64> {
    for word in &opt.requires {
        match argv.next(Some(seps)) {
            Some(Token::Text(t)) if &t == word => {}
            _ => return None,
        }
    }
    let Some(Token::Text(name)) = argv.next(Some(seps)) else {
        return None;
    };
    if opt.aliases.iter().any(|a| a == &name) {
        return Some(1);
    }
    if opt.compact {
        for alias in &opt.aliases {
            if name.len() > alias.len() {
                if let Some(rest) = name.strip_prefix(alias.as_str()) {
                    argv.rollback(Token::text(rest.to_string()), true);
                    return Some(1);
                }
            }
        }
    }
    if opt.action == Action::Count {
        for alias in &opt.aliases {
            let stem = alias.trim_start_matches('-');
            let got = name.trim_start_matches('-');
            if stem.is_empty()
                || got.len() <= stem.len()
                || got.len() % stem.len() != 0
                || name.starts_with('-') != alias.starts_with('-')
            {
                continue;
            }
            let repeats = got.len() / stem.len();
            if got == stem.repeat(repeats) {
                return Some(repeats as i64);
            }
        }
    }
    None
}

/// Match a subcommand's sentence and name. Cursor handling as with
/// [`match_opt_name`].
pub(crate) fn match_node_name(
    argv: &mut Argv,
    requires: &[String],
    aliases: &[String],
    seps: &[char],
) -> bool {
    for word in requires {
        match argv.next(Some(seps)) {
            Some(Token::Text(t)) if &t == word => {}
            _ => return false,
        }
    }
    match argv.next(Some(seps)) {
        Some(Token::Text(name)) => aliases.iter().any(|a| a == &name),
        _ => false,
    }
}

/// Try one option at the cursor. Soft no-match restores the cursor and
/// returns false; errors past the name are fatal.
pub(crate) fn try_option(
    argv: &mut Argv,
    opt: &Opt,
    seps: &[char],
    ctx: &MatchCtx,
    out: &mut BTreeMap<String, OptionResult>,
) -> Result<bool, ParseError> {
    let snap = argv.snapshot();
    let Some(repeats) = match_opt_name(argv, opt, seps) else {
        argv.restore(snap);
        return Ok(false);
    };
    let args = if opt.args.is_empty() {
        BTreeMap::new()
    } else {
        analyse_args(argv, &opt.args, seps, ctx)?
    };
    fold_option(out, opt, repeats, args);
    Ok(true)
}

/// Fold one match into the option's accumulated result per its action.
pub(crate) fn fold_option(
    out: &mut BTreeMap<String, OptionResult>,
    opt: &Opt,
    repeats: i64,
    args: BTreeMap<String, Value>,
) {
    match out.entry(opt.dest.clone()) {
        Entry::Vacant(slot) => {
            let args = if opt.action == Action::Append {
                args.into_iter()
                    .map(|(k, v)| (k, Value::List(vec![v])))
                    .collect()
            } else {
                args
            };
            slot.insert(OptionResult {
                value: opt.action.on_match(repeats),
                args,
            });
        }
        Entry::Occupied(mut slot) => {
            let current = slot.get_mut();
            match &opt.action {
                Action::Count => {
                    let prev = current.value.as_int().unwrap_or(0);
                    current.value = Value::Int(prev + repeats);
                }
                Action::Append => {
                    for (key, value) in args {
                        match current.args.get_mut(&key) {
                            Some(Value::List(items)) => items.push(value),
                            Some(other) => {
                                let old = std::mem::take(other);
                                *other = Value::List(vec![old, value]);
                            }
                            None => {
                                current.args.insert(key, Value::List(vec![value]));
                            }
                        }
                    }
                }
                _ => {
                    *current = OptionResult {
                        value: opt.action.on_match(repeats),
                        args,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv::ArgvOptions;
    use rstest::rstest;

    fn argv(input: &str) -> Argv {
        Argv::build(vec![Token::text(input)], ArgvOptions::default()).unwrap()
    }

    fn ids(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn run_args(input: &str, args: &Args, param_ids: &[&str]) -> Result<BTreeMap<String, Value>, ParseError> {
        let ids = ids(param_ids);
        let ctx = MatchCtx { param_ids: &ids };
        let mut argv = argv(input);
        analyse_args(&mut argv, args, &[' '], &ctx)
    }

    // ========================================
    // positional slots
    // ========================================

    #[test]
    fn positionals_bind_in_order() {
        let args = Args::try_new(vec![
            Arg::new("foo", Pattern::int()),
            Arg::new("bar", Pattern::text()),
        ])
        .unwrap();
        let bound = run_args("2 hello", &args, &[]).unwrap();
        assert_eq!(bound.get("foo"), Some(&Value::Int(2)));
        assert_eq!(bound.get("bar"), Some(&Value::Str("hello".into())));
    }

    #[test]
    fn required_mismatch_is_params_unmatched() {
        let args = Args::try_new(vec![Arg::new("foo", Pattern::int())]).unwrap();
        let err = run_args("two", &args, &[]).unwrap_err();
        assert!(matches!(err, ParseError::ParamsUnmatched { .. }));
    }

    #[test]
    fn required_missing_is_params_missing() {
        let args = Args::try_new(vec![
            Arg::new("foo", Pattern::int()),
            Arg::new("bar", Pattern::int()),
        ])
        .unwrap();
        let err = run_args("1", &args, &[]).unwrap_err();
        assert_eq!(err, ParseError::ParamsMissing { slot: "bar".into() });
    }

    #[test]
    fn optional_mismatch_skips_and_binds_default() {
        let args = Args::try_new(vec![
            Arg::new("num", Pattern::int()).default_value(0i64),
            Arg::new("word", Pattern::text()),
        ])
        .unwrap();
        let bound = run_args("hello", &args, &[]).unwrap();
        assert_eq!(bound.get("num"), Some(&Value::Int(0)));
        assert_eq!(bound.get("word"), Some(&Value::Str("hello".into())));
    }

    #[test]
    fn validator_failure_is_invalid_param() {
        let args = Args::try_new(vec![Arg::new(
            "port",
            Pattern::int().validate(|v| v.as_int().is_some_and(|n| n > 0)),
        )])
        .unwrap();
        let err = run_args("-1", &args, &[]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidParam { .. }));
    }

    #[test]
    fn skippable_slot_yields_to_node_names() {
        let args = Args::try_new(vec![Arg::new("word", Pattern::text()).optional()]).unwrap();
        let mut argv = argv("--verbose");
        let set = ids(&["--verbose"]);
        let ctx = MatchCtx { param_ids: &set };
        let bound = analyse_args(&mut argv, &args, &[' '], &ctx).unwrap();
        assert!(bound.is_empty());
        // Token left for the node level.
        assert_eq!(argv.peek(None), Some(Token::text("--verbose")));
    }

    #[test]
    fn required_slot_binds_node_name_tokens() {
        let args = Args::try_new(vec![Arg::new("word", Pattern::text())]).unwrap();
        let bound = run_args("--verbose", &args, &["--verbose"]).unwrap();
        assert_eq!(bound.get("word"), Some(&Value::Str("--verbose".into())));
    }

    // ========================================
    // variadic slots
    // ========================================

    #[rstest]
    #[case("1 2 3", vec![1, 2, 3])]
    #[case("7", vec![7])]
    fn variadic_greedy(#[case] input: &str, #[case] expected: Vec<i64>) {
        let args = Args::try_new(vec![Arg::variadic(
            "nums",
            Pattern::int(),
            VariadicKind::ZeroOrMore,
        )])
        .unwrap();
        let bound = run_args(input, &args, &[]).unwrap();
        let expected: Vec<Value> = expected.into_iter().map(Value::Int).collect();
        assert_eq!(bound.get("nums"), Some(&Value::List(expected)));
    }

    #[test]
    fn variadic_zero_or_more_binds_empty() {
        let args = Args::try_new(vec![
            Arg::variadic("nums", Pattern::int(), VariadicKind::ZeroOrMore),
            Arg::new("tail", Pattern::text()),
        ])
        .unwrap();
        let bound = run_args("word", &args, &[]).unwrap();
        assert_eq!(bound.get("nums"), Some(&Value::List(Vec::new())));
        assert_eq!(bound.get("tail"), Some(&Value::Str("word".into())));
    }

    #[test]
    fn variadic_one_or_more_requires_input() {
        let args = Args::try_new(vec![Arg::variadic(
            "nums",
            Pattern::int(),
            VariadicKind::OneOrMore,
        )])
        .unwrap();
        let err = run_args("word", &args, &[]).unwrap_err();
        assert_eq!(err, ParseError::ParamsMissing { slot: "nums".into() });
    }

    #[test]
    fn variadic_respects_cap() {
        let args = Args::try_new(vec![
            Arg::variadic("nums", Pattern::int(), VariadicKind::ZeroOrMore).capped(2),
            Arg::new("tail", Pattern::int()),
        ])
        .unwrap();
        let bound = run_args("1 2 3", &args, &[]).unwrap();
        assert_eq!(
            bound.get("nums"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(bound.get("tail"), Some(&Value::Int(3)));
    }

    #[test]
    fn variadic_stops_at_node_names() {
        let args = Args::try_new(vec![Arg::variadic(
            "words",
            Pattern::text(),
            VariadicKind::ZeroOrMore,
        )])
        .unwrap();
        let set = ids(&["--opt"]);
        let ctx = MatchCtx { param_ids: &set };
        let mut argv = argv("a b --opt c");
        let bound = analyse_args(&mut argv, &args, &[' '], &ctx).unwrap();
        assert_eq!(
            bound.get("words"),
            Some(&Value::List(vec![
                Value::Str("a".into()),
                Value::Str("b".into())
            ]))
        );
        assert_eq!(argv.peek(None), Some(Token::text("--opt")));
    }

    // ========================================
    // keyword slots
    // ========================================

    #[test]
    fn keyword_slots_bind_in_any_order() {
        let args = Args::try_new(vec![
            Arg::keyword("foo", Pattern::int()),
            Arg::keyword("bar", Pattern::text()),
        ])
        .unwrap();
        let bound = run_args("bar=x foo=3", &args, &[]).unwrap();
        assert_eq!(bound.get("foo"), Some(&Value::Int(3)));
        assert_eq!(bound.get("bar"), Some(&Value::Str("x".into())));
    }

    #[test]
    fn keyword_value_may_come_from_next_token() {
        let args = Args::try_new(vec![Arg::keyword("foo", Pattern::int())]).unwrap();
        let bound = run_args("foo= 3", &args, &[]).unwrap();
        assert_eq!(bound.get("foo"), Some(&Value::Int(3)));
    }

    #[test]
    fn missing_keyword_is_argument_missing() {
        let args = Args::try_new(vec![Arg::keyword("foo", Pattern::int())]).unwrap();
        let err = run_args("3", &args, &[]).unwrap_err();
        assert_eq!(err, ParseError::ArgumentMissing { key: "foo".into() });
    }

    #[test]
    fn optional_keyword_binds_default_when_absent() {
        let args = Args::try_new(vec![
            Arg::keyword("mode", Pattern::text()).default_value("fast"),
            Arg::new("word", Pattern::text()),
        ])
        .unwrap();
        let bound = run_args("hello", &args, &[]).unwrap();
        assert_eq!(bound.get("mode"), Some(&Value::Str("fast".into())));
        assert_eq!(bound.get("word"), Some(&Value::Str("hello".into())));
    }

    #[test]
    fn keyword_variadic_collects_a_map() {
        let args = Args::try_new(vec![Arg::keyword_variadic(
            "env",
            Pattern::text(),
            VariadicKind::ZeroOrMore,
        )])
        .unwrap();
        let bound = run_args("a=1 b=2", &args, &[]).unwrap();
        let Some(Value::Map(map)) = bound.get("env") else {
            panic!("expected map, got {:?}", bound.get("env"));
        };
        assert_eq!(map.get("a"), Some(&Value::Str("1".into())));
        assert_eq!(map.get("b"), Some(&Value::Str("2".into())));
    }

    #[test]
    fn rest_swallows_everything() {
        let args = Args::try_new(vec![
            Arg::new("first", Pattern::text()),
            Arg::rest("tail"),
        ])
        .unwrap();
        let bound = run_args("a b c d", &args, &[]).unwrap();
        assert_eq!(bound.get("first"), Some(&Value::Str("a".into())));
        assert_eq!(
            bound.get("tail"),
            Some(&Value::List(vec![
                Value::Str("b".into()),
                Value::Str("c".into()),
                Value::Str("d".into())
            ]))
        );
    }

    // ========================================
    // option name matching
    // ========================================

    fn opt(raw: &str) -> Opt {
        Opt::new(raw).unwrap()
    }

    #[rstest]
    #[case("--upgrade", "--upgrade rest", Some(1))]
    #[case("-u|--upgrade", "-u rest", Some(1))]
    #[case("--upgrade", "--downgrade rest", None)]
    fn plain_name_matching(#[case] raw: &str, #[case] input: &str, #[case] expected: Option<i64>) {
        let mut argv = argv(input);
        assert_eq!(match_opt_name(&mut argv, &opt(raw), &[' ']), expected);
    }

    #[test]
    fn compact_name_pushes_back_remainder() {
        let option = opt("-f").compact();
        let mut argv = argv("-f1 next");
        assert_eq!(match_opt_name(&mut argv, &option, &[' ']), Some(1));
        assert_eq!(argv.next(None), Some(Token::text("1")));
        assert_eq!(argv.next(None), Some(Token::text("next")));
    }

    #[rstest]
    #[case("-vvvv", Some(4))]
    #[case("-v", Some(1))]
    #[case("-vvx", None)]
    #[case("vvv", None)]
    fn count_clustering(#[case] input: &str, #[case] expected: Option<i64>) {
        let option = opt("--verbose|-v").action(Action::Count);
        let mut argv = argv(input);
        assert_eq!(match_opt_name(&mut argv, &option, &[' ']), expected);
    }

    #[test]
    fn sentence_words_must_precede_the_name() {
        let option = opt("remote add origin");
        let mut ok = argv("remote add origin x");
        assert_eq!(match_opt_name(&mut ok, &option, &[' ']), Some(1));
        let mut bad = argv("add origin x");
        assert_eq!(match_opt_name(&mut bad, &option, &[' ']), None);
    }

    // ========================================
    // action folding
    // ========================================

    #[test]
    fn append_accumulates_args_in_input_order() {
        let option = opt("-f")
            .compact()
            .action(Action::Append)
            .args(Args::try_new(vec![Arg::new("flag", Pattern::text())]).unwrap());
        let mut out = BTreeMap::new();
        for v in ["1", "2", "3"] {
            let mut args = BTreeMap::new();
            args.insert("flag".to_string(), Value::Str(v.into()));
            fold_option(&mut out, &option, 1, args);
        }
        assert_eq!(
            out.get("f").map(|r| r.args.get("flag").cloned()),
            Some(Some(Value::List(vec![
                Value::Str("1".into()),
                Value::Str("2".into()),
                Value::Str("3".into())
            ])))
        );
    }

    #[test]
    fn count_adds_repeats() {
        let option = opt("--verbose|-v").action(Action::Count);
        let mut out = BTreeMap::new();
        fold_option(&mut out, &option, 3, BTreeMap::new());
        fold_option(&mut out, &option, 1, BTreeMap::new());
        assert_eq!(out.get("verbose").map(|r| r.value.clone()), Some(Value::Int(4)));
    }

    #[test]
    fn store_is_last_write_wins() {
        let option = opt("--mode").args(
            Args::try_new(vec![Arg::new("m", Pattern::text())]).unwrap(),
        );
        let mut out = BTreeMap::new();
        let mut first = BTreeMap::new();
        first.insert("m".to_string(), Value::Str("a".into()));
        fold_option(&mut out, &option, 1, first);
        let mut second = BTreeMap::new();
        second.insert("m".to_string(), Value::Str("b".into()));
        fold_option(&mut out, &option, 1, second);
        assert_eq!(
            out.get("mode").and_then(|r| r.args.get("m").cloned()),
            Some(Value::Str("b".into()))
        );
    }
}
