//! Header compilation and matching.
//!
//! A header is the command's entry point: a set of prefixes combined with
//! the command name. Names may embed `{key:type}` brackets, which compile
//! to named capture groups; captured groups land in the head match.

use crate::argv::Argv;
use crate::command::Prefix;
use crate::error::{ParseError, SchemaError};
use crate::result::HeadMatch;
use crate::token::Token;
use regex::Regex;
use std::any::TypeId;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub(crate) enum HeaderMatcher {
    Literal(String),
    Pattern {
        /// Anchored at both ends, for whole-token matching.
        full: Regex,
        /// Anchored at the start only, for compact matching.
        head: Regex,
    },
}

impl HeaderMatcher {
    fn from_name(name: &str) -> Result<Self, SchemaError> {
        match brackets_to_regex(name) {
            Some(source) => Ok(HeaderMatcher::Pattern {
                full: Regex::new(&format!("^{source}$"))?,
                head: Regex::new(&format!("^{source}"))?,
            }),
            None => Ok(HeaderMatcher::Literal(name.to_string())),
        }
    }
}

/// One text-prefix ⊕ name combination.
#[derive(Clone, Debug)]
pub(crate) struct HeaderPair {
    pub display: String,
    pub matcher: HeaderMatcher,
}

/// Header compiled at command build time.
#[derive(Clone, Debug)]
pub(crate) struct CompiledHeader {
    pub pairs: Vec<HeaderPair>,
    /// Opaque prefixes: the first token matches by type, the second is the
    /// command name.
    pub opaque_pairs: Vec<(TypeId, &'static str, HeaderMatcher)>,
    pub compact: bool,
}

impl CompiledHeader {
    /// All known entry spellings, for fuzzy suggestions and help.
    pub fn candidates(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.display.clone()).collect()
    }
}

pub(crate) fn compile(
    prefixes: &[Prefix],
    name: &str,
    compact: bool,
) -> Result<CompiledHeader, SchemaError> {
    if name.trim().is_empty() {
        return Err(SchemaError::NameEmpty);
    }
    let mut pairs = Vec::new();
    let mut opaque_pairs = Vec::new();
    let text_prefixes: Vec<&String> = prefixes
        .iter()
        .filter_map(|p| match p {
            Prefix::Text(s) => Some(s),
            Prefix::Type { .. } => None,
        })
        .collect();
    if prefixes.is_empty() {
        pairs.push(HeaderPair {
            display: name.to_string(),
            matcher: HeaderMatcher::from_name(name)?,
        });
    } else {
        for prefix in text_prefixes {
            let combined = format!("{prefix}{name}");
            pairs.push(HeaderPair {
                matcher: HeaderMatcher::from_name(&combined)?,
                display: combined,
            });
        }
    }
    for prefix in prefixes {
        if let Prefix::Type { id, name: tn } = prefix {
            opaque_pairs.push((*id, *tn, HeaderMatcher::from_name(name)?));
        }
    }
    Ok(CompiledHeader {
        pairs,
        opaque_pairs,
        compact,
    })
}

/// Convert `{key:type}` brackets to a regex source, or `None` for a plain
/// literal name.
fn brackets_to_regex(name: &str) -> Option<String> {
    if !name.contains('{') {
        return None;
    }
    let mut out = String::new();
    let mut literal = String::new();
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }
        let mut inner = String::new();
        let mut closed = false;
        for n in chars.by_ref() {
            if n == '}' {
                closed = true;
                break;
            }
            inner.push(n);
        }
        if !closed {
            literal.push('{');
            literal.push_str(&inner);
            continue;
        }
        out.push_str(&regex::escape(&literal));
        literal.clear();
        let (key, ty) = match inner.split_once(':') {
            Some((k, t)) => (k, t),
            None => (inner.as_str(), ""),
        };
        let sub = type_sub_pattern(ty);
        if key.is_empty() {
            out.push_str(&format!("(?:{sub})"));
        } else {
            out.push_str(&format!("(?P<{key}>{sub})"));
        }
    }
    out.push_str(&regex::escape(&literal));
    Some(out)
}

fn type_sub_pattern(ty: &str) -> &'static str {
    match ty {
        "int" => r"\d+",
        "float" => r"\d+\.?\d*",
        "str" | "" => r"\S+",
        "word" => r"\w+",
        _ => r".+?",
    }
}

fn group_map(re: &Regex, text: &str) -> BTreeMap<String, String> {
    let mut groups = BTreeMap::new();
    if let Some(caps) = re.captures(text) {
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                groups.insert(name.to_string(), m.as_str().to_string());
            }
        }
    }
    groups
}

/// Match the header at the cursor. On failure the cursor is restored and
/// the offending text is reported.
pub(crate) fn match_header(
    header: &CompiledHeader,
    argv: &mut Argv,
) -> Result<HeadMatch, ParseError> {
    let snap = argv.snapshot();
    let Some(first) = argv.next(None) else {
        return Err(ParseError::HeaderMismatch {
            target: String::new(),
        });
    };
    match &first {
        Token::Text(text) => {
            for pair in &header.pairs {
                match &pair.matcher {
                    HeaderMatcher::Literal(expected) => {
                        if text == expected {
                            return Ok(head_ok(first.clone(), expected.clone(), BTreeMap::new()));
                        }
                        if header.compact && text.len() > expected.len() {
                            if let Some(rest) = text.strip_prefix(expected.as_str()) {
                                let rest = rest.to_string();
                                argv.rollback(Token::text(rest), true);
                                return Ok(head_ok(
                                    Token::text(expected.clone()),
                                    expected.clone(),
                                    BTreeMap::new(),
                                ));
                            }
                        }
                    }
                    HeaderMatcher::Pattern { full, head } => {
                        if full.is_match(text) {
                            let groups = group_map(full, text);
                            return Ok(head_ok(first.clone(), text.clone(), groups));
                        }
                        if header.compact {
                            if let Some(m) = head.find(text) {
                                if m.start() == 0 && m.end() < text.len() {
                                    let matched = m.as_str().to_string();
                                    let rest = text[m.end()..].to_string();
                                    let groups = group_map(head, text);
                                    argv.rollback(Token::text(rest), true);
                                    return Ok(head_ok(
                                        Token::text(matched.clone()),
                                        matched,
                                        groups,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
            argv.restore(snap);
            Err(ParseError::HeaderMismatch {
                target: text.clone(),
            })
        }
        Token::Opaque(o) => {
            for (tid, _tn, matcher) in &header.opaque_pairs {
                if o.type_id() != *tid {
                    continue;
                }
                let Some(Token::Text(name)) = argv.next(None) else {
                    break;
                };
                let hit = match matcher {
                    HeaderMatcher::Literal(expected) => {
                        (&name == expected).then(|| (expected.clone(), BTreeMap::new()))
                    }
                    HeaderMatcher::Pattern { full, .. } => full
                        .is_match(&name)
                        .then(|| (name.clone(), group_map(full, &name))),
                };
                if let Some((result, groups)) = hit {
                    return Ok(head_ok(first.clone(), result, groups));
                }
                break;
            }
            argv.restore(snap);
            Err(ParseError::HeaderMismatch {
                target: format!("<{}>", o.type_name()),
            })
        }
    }
}

fn head_ok(origin: Token, result: String, groups: BTreeMap<String, String>) -> HeadMatch {
    HeadMatch {
        origin: Some(origin),
        result: Some(result),
        matched: true,
        groups,
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

    fn literal_header(prefixes: &[&str], name: &str, compact: bool) -> CompiledHeader {
        let prefixes: Vec<Prefix> = prefixes
            .iter()
            .map(|p| Prefix::Text(p.to_string()))
            .collect();
        compile(&prefixes, name, compact).unwrap()
    }

    #[rstest]
    #[case(&[], "/pip", "/pip install", "/pip")]
    #[case(&["/", "!"], "pip", "!pip list", "!pip")]
    fn literal_headers_match(
        #[case] prefixes: &[&str],
        #[case] name: &str,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let header = literal_header(prefixes, name, false);
        let mut argv = argv(input);
        let head = match_header(&header, &mut argv).unwrap();
        assert!(head.matched);
        assert_eq!(head.result.as_deref(), Some(expected));
    }

    #[test]
    fn mismatch_restores_the_cursor() {
        let header = literal_header(&[], "/pip", false);
        let mut argv = argv("/pop install");
        let err = match_header(&header, &mut argv).unwrap_err();
        assert_eq!(
            err,
            ParseError::HeaderMismatch {
                target: "/pop".into()
            }
        );
        assert_eq!(argv.next(None), Some(Token::text("/pop")));
    }

    #[test]
    fn compact_header_pushes_back_the_rest() {
        let header = literal_header(&[], "rd", true);
        let mut argv = argv("rd123");
        let head = match_header(&header, &mut argv).unwrap();
        assert_eq!(head.result.as_deref(), Some("rd"));
        assert_eq!(argv.next(None), Some(Token::text("123")));
    }

    #[test]
    fn bracket_header_captures_groups() {
        let header = literal_header(&[], "user{uid:int}", false);
        let mut argv = argv("user42 info");
        let head = match_header(&header, &mut argv).unwrap();
        assert!(head.matched);
        assert_eq!(head.groups.get("uid").map(String::as_str), Some("42"));
        assert_eq!(argv.next(None), Some(Token::text("info")));
    }

    #[test]
    fn bracket_header_rejects_wrong_shape() {
        let header = literal_header(&[], "user{uid:int}", false);
        let mut argv = argv("userx info");
        assert!(match_header(&header, &mut argv).is_err());
    }

    #[test]
    fn opaque_prefix_matches_by_type() {
        struct AtMe;
        let prefixes = vec![Prefix::Type {
            id: TypeId::of::<AtMe>(),
            name: "AtMe",
        }];
        let header = compile(&prefixes, "pip", false).unwrap();
        let mut argv = Argv::build(
            vec![Token::opaque(AtMe), Token::text("pip list")],
            ArgvOptions::default(),
        )
        .unwrap();
        let head = match_header(&header, &mut argv).unwrap();
        assert!(head.matched);
        assert_eq!(head.result.as_deref(), Some("pip"));
        assert_eq!(argv.next(None), Some(Token::text("list")));
    }

    #[test]
    fn candidates_list_all_combos() {
        let header = literal_header(&["/", "!"], "pip", false);
        assert_eq!(header.candidates(), vec!["/pip", "!pip"]);
    }
}
