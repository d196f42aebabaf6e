//! Lenient JSON repair for AI-emitted command payloads.
//!
//! The AI is not guaranteed to produce strict JSON. Exactly two repairs are
//! applied: bare property names outside string literals are quoted, and
//! unbalanced/missing braces are closed (braces inside string literals do
//! not count). Anything still malformed after that is a reported parse
//! error, never silently swallowed.

use regex::Regex;
use std::sync::LazyLock;

static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[{,]\s*([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("bare key pattern")
});

/// Byte ranges of double-quoted string literals, backslash escapes honored.
/// An unterminated literal extends to the end of the input.
fn string_spans(input: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        match start {
            Some(s) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    spans.push((s, i + 1));
                    start = None;
                }
            }
            None => {
                if c == '"' {
                    start = Some(i);
                }
            }
        }
    }
    if let Some(s) = start {
        spans.push((s, input.len()));
    }
    spans
}

fn in_span(spans: &[(usize, usize)], pos: usize) -> bool {
    spans.iter().any(|&(a, b)| pos >= a && pos < b)
}

fn quote_bare_keys(input: &str) -> String {
    let spans = string_spans(input);
    let mut out = String::with_capacity(input.len() + 8);
    let mut last = 0;
    for caps in BARE_KEY.captures_iter(input) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // `word:` inside a string value is content, not a key.
        if in_span(&spans, name.start()) {
            continue;
        }
        out.push_str(&input[last..name.start()]);
        out.push('"');
        out.push_str(name.as_str());
        out.push_str("\":");
        last = whole.end();
    }
    out.push_str(&input[last..]);
    out
}

/// Apply the two documented repairs and return the candidate JSON string.
pub fn repair_json(input: &str) -> String {
    let mut out = input.trim().to_string();
    if !out.starts_with('{') {
        out.insert(0, '{');
    }
    out = quote_bare_keys(&out);

    let spans = string_spans(&out);
    let open = out
        .char_indices()
        .filter(|&(i, c)| c == '{' && !in_span(&spans, i))
        .count();
    let close = out
        .char_indices()
        .filter(|&(i, c)| c == '}' && !in_span(&spans, i))
        .count();
    for _ in close..open {
        out.push('}');
    }
    out
}

/// Repair then parse. The offending input is the caller's to log.
pub fn parse_lenient_json(input: &str) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::from_str(&repair_json(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_keys_without_braces() {
        let value = parse_lenient_json(r#"name: "Ana", age: 5"#).expect("lenient parse");
        assert_eq!(value, json!({ "name": "Ana", "age": 5 }));
    }

    #[test]
    fn closes_missing_brace() {
        let value = parse_lenient_json(r#"{"phone": "549112233", "status": "done""#)
            .expect("lenient parse");
        assert_eq!(value, json!({ "phone": "549112233", "status": "done" }));
    }

    #[test]
    fn closes_nested_missing_braces() {
        let value =
            parse_lenient_json(r#"{filter: {city: "BA", zone: "norte""#).expect("lenient parse");
        assert_eq!(value, json!({ "filter": { "city": "BA", "zone": "norte" } }));
    }

    #[test]
    fn leaves_strict_json_untouched() {
        let input = r#"{"a": 1, "b": [1, 2]}"#;
        assert_eq!(repair_json(input), input);
    }

    #[test]
    fn does_not_quote_keys_inside_strings() {
        let value = parse_lenient_json(r#"{note: "said: hola"}"#).expect("lenient parse");
        assert_eq!(value, json!({ "note": "said: hola" }));
    }

    #[test]
    fn does_not_quote_key_like_text_after_comma_inside_strings() {
        let value = parse_lenient_json(r#"{note: "a, b: c"}"#).expect("lenient parse");
        assert_eq!(value, json!({ "note": "a, b: c" }));
    }

    #[test]
    fn ignores_braces_inside_strings_when_balancing() {
        let value = parse_lenient_json(r#"{note: "open {"}"#).expect("lenient parse");
        assert_eq!(value, json!({ "note": "open {" }));
    }

    #[test]
    fn reports_garbage_instead_of_guessing() {
        assert!(parse_lenient_json("::not json at all::").is_err());
    }
}
