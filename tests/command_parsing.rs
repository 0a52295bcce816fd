mod common;

use common::{pip, query, str_list, str_value};
use parlance::{
    Action, Arg, Args, Command, Opt, ParseError, Pattern, Subcommand, Token, Value, VariadicKind,
};
use rstest::rstest;
use std::path::PathBuf;

// ========================================
// nested subcommand with option and args
// ========================================

#[test]
fn install_with_upgrade_flag() {
    let result = pip().parse("/pip install numpy --upgrade");
    assert!(result.matched, "unexpected failure: {:?}", result.error_info);
    assert_eq!(
        query(&result, "subcommands.install.args.pak_name"),
        str_value("numpy")
    );
    assert!(result.find("subcommands.install.options.upgrade.value"));
}

#[rstest]
#[case("/pip install numpy --upgrade")]
#[case("/pip install --upgrade numpy")]
fn option_position_within_scope_is_free(#[case] input: &str) {
    let result = pip().parse(input);
    assert!(result.matched);
    assert_eq!(query(&result, "install.pak_name"), str_value("numpy"));
}

#[test]
fn plain_option_at_root() {
    let result = pip().parse("/pip list");
    assert!(result.matched);
    assert!(result.find("options.list"));
    assert!(result.subcommands.is_empty());
}

#[test]
fn subcommand_missing_required_arg_fails() {
    let result = pip().parse("/pip install");
    assert!(!result.matched);
    assert!(matches!(
        result.error_info,
        Some(ParseError::ParamsMissing { .. })
    ));
}

// ========================================
// typed main args
// ========================================

fn callback() -> Command {
    Command::new("callback")
        .args(
            Args::try_new(vec![
                Arg::new("foo", Pattern::int()),
                Arg::new("bar", Pattern::text()),
            ])
            .unwrap(),
        )
        .build()
        .unwrap()
}

#[test]
fn typed_args_convert() {
    let result = callback().parse("callback 2 hello");
    assert!(result.matched);
    assert_eq!(result.main_args.get("foo"), Some(&Value::Int(2)));
    assert_eq!(result.main_args.get("bar"), Some(&str_value("hello")));
}

#[test]
fn type_mismatch_reports_params_unmatched() {
    let result = callback().parse("callback two hello");
    assert!(!result.matched);
    assert!(matches!(
        result.error_info,
        Some(ParseError::ParamsUnmatched { .. })
    ));
}

// ========================================
// count, compact-append, and store_true together
// ========================================

fn component() -> Command {
    Command::new("component")
        .args(Args::try_new(vec![Arg::new("path", Pattern::text())]).unwrap())
        .option(Opt::new("--verbose|-v").unwrap().action(Action::Count))
        .option(
            Opt::new("-f")
                .unwrap()
                .compact()
                .action(Action::Append)
                .args(Args::try_new(vec![Arg::new("flag", Pattern::text())]).unwrap()),
        )
        .subcommand(
            Subcommand::new("sub").unwrap().option(
                Opt::new("bar")
                    .unwrap()
                    .action(Action::StoreTrue)
                    .default_value(false),
            ),
        )
        .build()
        .unwrap()
}

#[test]
fn clustered_count_compact_append_and_store_true() {
    let result = component().parse("component /home -vvvv -f1 -f2 -f3 sub bar");
    assert!(result.matched, "unexpected failure: {:?}", result.error_info);
    assert_eq!(result.main_args.get("path"), Some(&str_value("/home")));
    assert_eq!(query(&result, "options.verbose.value"), Value::Int(4));
    assert_eq!(query(&result, "options.f.args.flag"), str_list(&["1", "2", "3"]));
    assert_eq!(
        query(&result, "subcommands.sub.options.bar.value"),
        Value::Bool(true)
    );
}

#[test]
fn repeated_long_form_counts_once_each() {
    let result = component().parse("component /home --verbose -vv");
    assert!(result.matched);
    assert_eq!(query(&result, "options.verbose.value"), Value::Int(3));
}

#[test]
fn store_true_default_applies_when_absent() {
    let result = component().parse("component /home sub");
    assert!(result.matched);
    assert_eq!(
        query(&result, "subcommands.sub.options.bar.value"),
        Value::Bool(false)
    );
}

// ========================================
// action algebra
// ========================================

#[test]
fn store_keeps_the_last_match() {
    let cmd = Command::new("cfg")
        .option(
            Opt::new("--mode")
                .unwrap()
                .args(Args::try_new(vec![Arg::new("m", Pattern::text())]).unwrap()),
        )
        .build()
        .unwrap();
    let result = cmd.parse("cfg --mode a --mode b");
    assert!(result.matched);
    assert_eq!(query(&result, "options.mode.args.m"), str_value("b"));
}

#[test]
fn append_preserves_input_order() {
    let cmd = Command::new("acc")
        .option(
            Opt::new("--add")
                .unwrap()
                .action(Action::Append)
                .args(Args::try_new(vec![Arg::new("item", Pattern::text())]).unwrap()),
        )
        .build()
        .unwrap();
    let result = cmd.parse("acc --add x --add y --add z");
    assert!(result.matched);
    assert_eq!(
        query(&result, "options.add.args.item"),
        str_list(&["x", "y", "z"])
    );
}

#[test]
fn store_value_uses_the_schema_constant() {
    let cmd = Command::new("lvl")
        .option(
            Opt::new("--debug")
                .unwrap()
                .action(Action::StoreValue(Value::Int(10))),
        )
        .build()
        .unwrap();
    let result = cmd.parse("lvl --debug");
    assert_eq!(query(&result, "options.debug.value"), Value::Int(10));
}

// ========================================
// heterogeneous token input
// ========================================

fn read() -> Command {
    Command::new("read")
        .args(Args::try_new(vec![Arg::new("data", Pattern::bytes())]).unwrap())
        .build()
        .unwrap()
}

#[test]
fn bytes_pattern_accepts_opaque_bytes() {
    let result = read().parse(vec![Token::text("read"), Token::opaque(b"hello".to_vec())]);
    assert!(result.matched);
    assert_eq!(
        result.main_args.get("data"),
        Some(&Value::Bytes(b"hello".to_vec()))
    );
}

#[test]
fn bytes_pattern_converts_text() {
    let result = read().parse("read some_text");
    assert!(result.matched);
    assert_eq!(
        result.main_args.get("data"),
        Some(&Value::Bytes(b"some_text".to_vec()))
    );
}

#[test]
fn bytes_pattern_converts_opaque_path() {
    let result = read().parse(vec![
        Token::text("read"),
        Token::opaque(PathBuf::from("x.py")),
    ]);
    assert!(result.matched);
    assert_eq!(
        result.main_args.get("data"),
        Some(&Value::Bytes(b"x.py".to_vec()))
    );
}

// ========================================
// strict mode and $extra
// ========================================

#[test]
fn strict_mode_rejects_unaccounted_tokens() {
    let cmd = Command::new("one")
        .args(Args::try_new(vec![Arg::new("a", Pattern::text())]).unwrap())
        .build()
        .unwrap();
    let result = cmd.parse("one a b c");
    assert!(!result.matched);
    assert!(matches!(
        result.error_info,
        Some(ParseError::ParamsUnmatched { .. })
    ));
    assert!(!result.error_data.is_empty());
}

#[test]
fn lenient_mode_collects_extra_tokens() {
    let cmd = Command::new("one")
        .strict(false)
        .args(Args::try_new(vec![Arg::new("a", Pattern::text())]).unwrap())
        .build()
        .unwrap();
    let result = cmd.parse("one a b c");
    assert!(result.matched);
    assert_eq!(result.main_args.get("$extra"), Some(&str_list(&["b", "c"])));
}

// ========================================
// defaults and variadics
// ========================================

#[test]
fn defaults_populate_skipped_slots() {
    let cmd = Command::new("greet")
        .args(
            Args::try_new(vec![
                Arg::new("name", Pattern::text()),
                Arg::new("times", Pattern::int()).default_value(1i64),
            ])
            .unwrap(),
        )
        .build()
        .unwrap();
    let result = cmd.parse("greet alice");
    assert!(result.matched);
    assert_eq!(result.main_args.get("times"), Some(&Value::Int(1)));

    let result = cmd.parse("greet alice 3");
    assert_eq!(result.main_args.get("times"), Some(&Value::Int(3)));
}

#[test]
fn variadic_main_args_stop_at_options() {
    let cmd = Command::new("sum")
        .args(
            Args::try_new(vec![Arg::variadic(
                "nums",
                Pattern::int(),
                VariadicKind::ZeroOrMore,
            )])
            .unwrap(),
        )
        .option(Opt::new("--json").unwrap())
        .build()
        .unwrap();
    let result = cmd.parse("sum 1 2 3 --json");
    assert!(result.matched, "unexpected failure: {:?}", result.error_info);
    assert_eq!(
        result.main_args.get("nums"),
        Some(&Value::List(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3)
        ]))
    );
    assert!(result.find("options.json"));
}

#[test]
fn keyword_args_bind_by_key() {
    let cmd = Command::new("conn")
        .args(
            Args::try_new(vec![
                Arg::new("host", Pattern::text()),
                Arg::keyword("port", Pattern::int()).default_value(22i64),
            ])
            .unwrap(),
        )
        .build()
        .unwrap();
    let result = cmd.parse("conn example.org port=2222");
    assert!(result.matched);
    assert_eq!(result.main_args.get("port"), Some(&Value::Int(2222)));

    let result = cmd.parse("conn example.org");
    assert!(result.matched);
    assert_eq!(result.main_args.get("port"), Some(&Value::Int(22)));
}

// ========================================
// sentence-prefixed options
// ========================================

#[test]
fn sentence_prefixed_option_needs_its_words() {
    let cmd = Command::new("git")
        .option(
            Opt::new("remote add origin")
                .unwrap()
                .args(Args::try_new(vec![Arg::new("url", Pattern::text())]).unwrap()),
        )
        .build()
        .unwrap();
    let result = cmd.parse("git remote add origin https://example.org/repo");
    assert!(result.matched, "unexpected failure: {:?}", result.error_info);
    assert_eq!(
        query(&result, "options.origin.args.url"),
        str_value("https://example.org/repo")
    );

    let partial = cmd.parse("git add origin https://example.org/repo");
    assert!(!partial.matched);
}

// ========================================
// determinism
// ========================================

#[test]
fn identical_inputs_yield_equal_results() {
    let cmd = component();
    let a = cmd.parse("component /home -vv -f1 sub bar");
    let b = cmd.parse("component /home -vv -f1 sub bar");
    assert_eq!(a, b);
}

// ========================================
// quoting
// ========================================

#[test]
fn quoted_tokens_keep_their_spaces() {
    let cmd = Command::new("say")
        .args(Args::try_new(vec![Arg::new("text", Pattern::text())]).unwrap())
        .build()
        .unwrap();
    let result = cmd.parse("say 'hello there world'");
    assert!(result.matched);
    assert_eq!(
        result.main_args.get("text"),
        Some(&str_value("hello there world"))
    );
}

// ========================================
// raise_error configuration
// ========================================

#[test]
fn try_parse_surfaces_fatal_errors_when_configured() {
    let cmd = Command::new("callback")
        .raise_error()
        .args(Args::try_new(vec![Arg::new("foo", Pattern::int())]).unwrap())
        .build()
        .unwrap();
    let err = cmd.try_parse("callback nope").unwrap_err();
    assert!(matches!(err, ParseError::ParamsUnmatched { .. }));
    assert!(cmd.try_parse("callback 1").unwrap().matched);
}
