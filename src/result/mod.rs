//! Parse results and the dotted-path query API.

use crate::error::ParseError;
use crate::token::{Token, Value};
use std::collections::BTreeMap;

/// Outcome of header matching.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadMatch {
    /// The token(s) the header consumed, as entered.
    pub origin: Option<Token>,
    /// The matched entry, normalized.
    pub result: Option<String>,
    pub matched: bool,
    /// Captured bracket groups from a pattern header.
    pub groups: BTreeMap<String, String>,
}

/// Accumulated result of one option.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionResult {
    pub value: Value,
    pub args: BTreeMap<String, Value>,
}

/// Accumulated result of one subcommand, including its nested children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubcommandResult {
    pub value: Value,
    pub args: BTreeMap<String, Value>,
    pub options: BTreeMap<String, OptionResult>,
    pub subcommands: BTreeMap<String, SubcommandResult>,
}

/// The result tree returned by every parse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseResult {
    /// Original input tokens, before any preprocessing.
    pub origin: Vec<Token>,
    pub matched: bool,
    pub head: HeadMatch,
    pub main_args: BTreeMap<String, Value>,
    pub options: BTreeMap<String, OptionResult>,
    pub subcommands: BTreeMap<String, SubcommandResult>,
    /// All args bound anywhere in the tree, flattened by slot name.
    pub other_args: BTreeMap<String, Value>,
    pub error_info: Option<ParseError>,
    /// Input left unconsumed when the parse stopped.
    pub error_data: Vec<Token>,
    /// Output text from a built-in option (help, shortcut, completion).
    pub output: Option<String>,
    /// Candidate next-tokens recorded by a speculative (completion) parse.
    pub candidates: Vec<String>,
}

impl ParseResult {
    pub(crate) fn failed(origin: Vec<Token>, head: HeadMatch, error: ParseError) -> Self {
        Self {
            origin,
            matched: false,
            head,
            error_info: Some(error),
            ..Self::default()
        }
    }

    /// Flatten nested args into `other_args`. Called once at export.
    pub(crate) fn unpack(&mut self) {
        fn walk_opts(out: &mut BTreeMap<String, Value>, opts: &BTreeMap<String, OptionResult>) {
            for opt in opts.values() {
                for (k, v) in &opt.args {
                    out.insert(k.clone(), v.clone());
                }
            }
        }
        fn walk_subs(out: &mut BTreeMap<String, Value>, subs: &BTreeMap<String, SubcommandResult>) {
            for sub in subs.values() {
                for (k, v) in &sub.args {
                    out.insert(k.clone(), v.clone());
                }
                walk_opts(out, &sub.options);
                walk_subs(out, &sub.subcommands);
            }
        }
        let mut out = BTreeMap::new();
        walk_opts(&mut out, &self.options);
        walk_subs(&mut out, &self.subcommands);
        self.other_args = out;
    }

    /// All bound args: main args overlaid on the flattened rest.
    pub fn all_args(&self) -> BTreeMap<String, Value> {
        let mut out = self.other_args.clone();
        out.extend(self.main_args.clone());
        out
    }

    /// Look up a value by dotted path.
    ///
    /// Paths walk through subcommands and options, e.g.
    /// `"install.upgrade.value"` or `"options.f.args.flag"`. A missing path
    /// is `Ok(None)`; a component resolvable as both an option and a
    /// subcommand without an `options.`/`subcommands.` prefix is an
    /// [`ParseError::AmbiguousPath`].
    pub fn query(&self, path: &str) -> Result<Option<Value>, ParseError> {
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return Ok(None);
        }
        let head = parts[0];
        let rest = &parts[1..];
        match head {
            "options" => {
                let Some(&name) = rest.first() else {
                    return Ok(None);
                };
                Ok(query_options(&self.options, name, &rest[1..]))
            }
            "subcommands" => {
                let Some(&name) = rest.first() else {
                    return Ok(None);
                };
                query_subcommands(&self.subcommands, name, &rest[1..], path)
            }
            "main_args" | "$main" => Ok(rest
                .first()
                .and_then(|name| self.main_args.get(*name).cloned())),
            "other_args" | "$other" => Ok(rest
                .first()
                .and_then(|name| self.other_args.get(*name).cloned())),
            "args" if rest.len() == 1 => Ok(self.all_args().get(rest[0]).cloned()),
            name => {
                let in_opts = self.options.contains_key(name);
                let in_subs = self.subcommands.contains_key(name);
                if in_opts && in_subs {
                    return Err(ParseError::AmbiguousPath { path: path.into() });
                }
                if in_opts {
                    return Ok(query_options(&self.options, name, rest));
                }
                if in_subs {
                    return query_subcommands(&self.subcommands, name, rest, path);
                }
                if rest.is_empty() {
                    if let Some(v) = self.main_args.get(name) {
                        return Ok(Some(v.clone()));
                    }
                    if let Some(v) = self.other_args.get(name) {
                        return Ok(Some(v.clone()));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Whether a path resolves to a present value.
    pub fn find(&self, path: &str) -> bool {
        matches!(self.query(path), Ok(Some(_)))
    }

    /// The `n`th bound arg (0-based, main args first, then the flattened
    /// rest in slot-name order) whose value converts to `T`.
    pub fn query_nth<T: FromValue>(&self, n: usize) -> Option<T> {
        self.main_args
            .values()
            .chain(self.other_args.values())
            .filter_map(T::from_value)
            .nth(n)
    }
}

fn option_as_value(opt: &OptionResult) -> Value {
    let mut map = BTreeMap::new();
    map.insert("value".to_string(), opt.value.clone());
    map.insert("args".to_string(), Value::Map(opt.args.clone()));
    Value::Map(map)
}

fn query_options(
    options: &BTreeMap<String, OptionResult>,
    name: &str,
    rest: &[&str],
) -> Option<Value> {
    let opt = options.get(name)?;
    match rest {
        [] => Some(option_as_value(opt)),
        ["value"] => Some(opt.value.clone()),
        ["args"] => Some(Value::Map(opt.args.clone())),
        ["args", arg] => opt.args.get(*arg).cloned(),
        [arg] => opt.args.get(*arg).cloned(),
        _ => None,
    }
}

fn query_subcommands(
    subcommands: &BTreeMap<String, SubcommandResult>,
    name: &str,
    rest: &[&str],
    full_path: &str,
) -> Result<Option<Value>, ParseError> {
    let Some(sub) = subcommands.get(name) else {
        return Ok(None);
    };
    match rest {
        [] => Ok(Some(Value::Map(sub.args.clone()))),
        ["value"] => Ok(Some(sub.value.clone())),
        ["args"] => Ok(Some(Value::Map(sub.args.clone()))),
        ["args", arg] => Ok(sub.args.get(*arg).cloned()),
        ["options", inner, tail @ ..] => Ok(query_options(&sub.options, inner, tail)),
        ["subcommands", inner, tail @ ..] => {
            query_subcommands(&sub.subcommands, inner, tail, full_path)
        }
        [next, tail @ ..] => {
            let in_opts = sub.options.contains_key(*next);
            let in_subs = sub.subcommands.contains_key(*next);
            if in_opts && in_subs {
                return Err(ParseError::AmbiguousPath {
                    path: full_path.into(),
                });
            }
            if in_opts {
                return Ok(query_options(&sub.options, next, tail));
            }
            if in_subs {
                return query_subcommands(&sub.subcommands, next, tail, full_path);
            }
            if tail.is_empty() {
                return Ok(sub.args.get(*next).cloned());
            }
            Ok(None)
        }
    }
}

/// Conversion from a bound [`Value`] used by typed queries.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> ParseResult {
        let mut result = ParseResult {
            matched: true,
            ..ParseResult::default()
        };
        result
            .main_args
            .insert("path".into(), Value::Str("/home".into()));
        result.options.insert(
            "verbose".into(),
            OptionResult {
                value: Value::Int(4),
                args: BTreeMap::new(),
            },
        );
        let mut f_args = BTreeMap::new();
        f_args.insert(
            "flag".into(),
            Value::List(vec![Value::Str("1".into()), Value::Str("2".into())]),
        );
        result.options.insert(
            "f".into(),
            OptionResult {
                value: Value::None,
                args: f_args,
            },
        );
        let mut sub = SubcommandResult::default();
        sub.options.insert(
            "bar".into(),
            OptionResult {
                value: Value::Bool(true),
                args: BTreeMap::new(),
            },
        );
        sub.args.insert("pak".into(), Value::Str("numpy".into()));
        result.subcommands.insert("sub".into(), sub);
        result.unpack();
        result
    }

    #[rstest]
    #[case("path", Some(Value::Str("/home".into())))]
    #[case("verbose.value", Some(Value::Int(4)))]
    #[case("options.verbose.value", Some(Value::Int(4)))]
    #[case("f.args.flag", Some(Value::List(vec![Value::Str("1".into()), Value::Str("2".into())])))]
    #[case("f.flag", Some(Value::List(vec![Value::Str("1".into()), Value::Str("2".into())])))]
    #[case("sub.bar.value", Some(Value::Bool(true)))]
    #[case("sub.options.bar.value", Some(Value::Bool(true)))]
    #[case("subcommands.sub.options.bar.value", Some(Value::Bool(true)))]
    #[case("sub.pak", Some(Value::Str("numpy".into())))]
    #[case("sub.args.pak", Some(Value::Str("numpy".into())))]
    #[case("nope", None)]
    #[case("sub.nope", None)]
    #[case("options.missing.value", None)]
    fn query_paths(#[case] path: &str, #[case] expected: Option<Value>) {
        assert_eq!(sample().query(path).unwrap(), expected);
    }

    #[test]
    fn ambiguous_bare_name_errors() {
        let mut result = sample();
        result
            .subcommands
            .insert("verbose".into(), SubcommandResult::default());
        let err = result.query("verbose.value").unwrap_err();
        assert!(matches!(err, ParseError::AmbiguousPath { .. }));
        // Prefixed access still works.
        assert_eq!(
            result.query("options.verbose.value").unwrap(),
            Some(Value::Int(4))
        );
    }

    #[test]
    fn find_reports_presence() {
        let result = sample();
        assert!(result.find("path"));
        assert!(result.find("sub.bar.value"));
        assert!(!result.find("missing.path"));
    }

    #[test]
    fn unpack_flattens_nested_args() {
        let result = sample();
        assert_eq!(
            result.other_args.get("flag"),
            Some(&Value::List(vec![
                Value::Str("1".into()),
                Value::Str("2".into())
            ]))
        );
        assert_eq!(result.other_args.get("pak"), Some(&Value::Str("numpy".into())));
    }

    #[test]
    fn query_nth_by_type() {
        let result = sample();
        assert_eq!(result.query_nth::<String>(0), Some("/home".to_string()));
        assert_eq!(result.query_nth::<String>(1), Some("numpy".to_string()));
        assert_eq!(result.query_nth::<String>(2), None);
        assert_eq!(result.query_nth::<bool>(0), None);
    }
}
