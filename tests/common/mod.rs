#![allow(
    dead_code,
    reason = "shared test helper: not all helpers are used in every test binary"
)]

use parlance::{Arg, Args, Command, Opt, Pattern, Subcommand, Value};

/// The pip-style fixture used across end-to-end tests.
pub fn pip() -> Command {
    Command::new("/pip")
        .subcommand(
            Subcommand::new("install")
                .unwrap()
                .option(Opt::new("-u|--upgrade").unwrap())
                .args(Args::try_new(vec![Arg::new("pak_name", Pattern::text())]).unwrap()),
        )
        .option(Opt::new("list").unwrap())
        .build()
        .unwrap()
}

pub fn str_value(s: &str) -> Value {
    Value::Str(s.to_string())
}

pub fn str_list(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| str_value(s)).collect())
}

/// Query a path and unwrap both layers, panicking with context on miss.
pub fn query(result: &parlance::ParseResult, path: &str) -> Value {
    result
        .query(path)
        .unwrap_or_else(|e| panic!("query {path:?} failed: {e}"))
        .unwrap_or_else(|| panic!("query {path:?} found nothing in {result:?}"))
}
