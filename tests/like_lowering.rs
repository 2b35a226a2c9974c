//! Checks that LIKE patterns lowered to regexes accept exactly the
//! strings LIKE semantics accept: `%` matches any run, `_` one character,
//! anchored at both ends.

use sqlpipe::sql::Parser;
use sqlpipe::store::{Stores, TableCatalog};
use sqlpipe::translate::statement_info;

/// Reference LIKE matcher.
fn like_matches(pattern: &str, input: &str) -> bool {
    fn rec(pat: &[char], inp: &[char]) -> bool {
        match pat.split_first() {
            None => inp.is_empty(),
            Some(('%', rest)) => {
                (0..=inp.len()).any(|skip| rec(rest, &inp[skip..]))
            }
            Some(('_', rest)) => !inp.is_empty() && rec(rest, &inp[1..]),
            Some(('\\', rest)) => match rest.split_first() {
                Some((escaped, tail)) => {
                    inp.first() == Some(escaped) && rec(tail, &inp[1..])
                }
                None => inp.first() == Some(&'\\') && inp.len() == 1,
            },
            Some((ch, rest)) => inp.first() == Some(ch) && rec(rest, &inp[1..]),
        }
    }
    rec(
        &pat_chars(pattern),
        &pat_chars(input),
    )
}

fn pat_chars(value: &str) -> Vec<char> {
    value.chars().collect()
}

/// Translates `WHERE message LIKE pattern` and returns the emitted regex,
/// when the lowering chose the regex form.
fn lowered_regex(pattern: &str) -> Option<String> {
    let catalog = TableCatalog::new([("logs".to_string(), "*".to_string())]).unwrap();
    let stores = Stores::new(catalog, None);
    let sql = format!(
        "SELECT * FROM logs WHERE message LIKE '{}'",
        pattern.replace('\'', "''")
    );
    let mut parser = Parser::new(&sql);
    let stmt = parser.parse_statement().expect("statement");
    assert!(parser.errors().is_empty(), "{:?}", parser.errors());
    let program = statement_info(&stmt, &stores).unwrap().pipeql;

    let clause = program.strip_prefix("message:")?;
    let quoted = clause.strip_prefix("~\"")?.strip_suffix('"')?;
    Some(quoted.replace("\\\"", "\"").replace("\\\\", "\\"))
}

#[test]
fn regex_lowering_matches_like_semantics() {
    let patterns = [
        "%error_%",
        "_foo",
        "a_b%c",
        "x__",
        "%a%b%",
        "50%_off",
        "end_",
        "_",
    ];
    let inputs = [
        "", "f", "foo", "afoo", "xfoo", "error", "my error!", "xerrorY",
        "a1bc", "a1bzzc", "ab", "xab", "x12", "x1", "ab50zz offX", "50x off",
        "aXbY", "end1", "ends",
    ];

    for pattern in patterns {
        let regex_src = lowered_regex(pattern)
            .unwrap_or_else(|| panic!("expected regex lowering for {pattern:?}"));
        let re = regex::Regex::new(&regex_src)
            .unwrap_or_else(|err| panic!("invalid regex {regex_src:?}: {err}"));
        for input in inputs {
            assert_eq!(
                re.is_match(input),
                like_matches(pattern, input),
                "pattern {pattern:?} vs input {input:?} (regex {regex_src:?})"
            );
        }
    }
}

#[test]
fn simple_patterns_avoid_regexes() {
    // No wildcards, prefix, suffix, and contains forms lower to bare or
    // single-star values, not regexes.
    for pattern in ["plain", "fail%", "%tail", "%mid%", "%"] {
        assert!(
            lowered_regex(pattern).is_none(),
            "expected non-regex lowering for {pattern:?}"
        );
    }
}
