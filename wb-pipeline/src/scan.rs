//! Tagged-token scanner.
//!
//! Six delimiter families layered by convention, not a formal grammar. One
//! generic find/collect/strip combinator serves every stage so the final
//! sanitation pass can guarantee totality: no family ever survives to the
//! user, configured or not.

use regex::Regex;
use std::sync::LazyLock;

pub(crate) static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%[^%\n]{1,64}%%").expect("percent token pattern"));
pub(crate) static AGENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%(\d{1,3})%%").expect("agent token pattern"));
pub(crate) static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&&([\s\S]*?)&&").expect("ampersand block pattern"));
pub(crate) static DOLLAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$([\s\S]*?)\$\$").expect("dollar block pattern"));
pub(crate) static DOUBLE_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##([\s\S]*?)##").expect("double hash block pattern"));
static BRACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[\s\S]*?\}\}").expect("brace token pattern"));
static BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[\s\S]*?\]\]").expect("bracket token pattern"));
pub(crate) static BRACKET_PAYLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([\s\S]*?)\]\]").expect("bracket payload pattern"));
static HASH_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hash word pattern"));
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("blank run pattern"));

/// Collect the first capture group of every match of `pattern` in `text`.
pub(crate) fn collect_payloads(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// Remove every match of `pattern` from `text`.
pub(crate) fn strip_all(pattern: &Regex, text: &str) -> String {
    pattern.replace_all(text, "").into_owned()
}

/// Remove every occurrence of the literal token `%%name%%`.
pub(crate) fn strip_literal_tag(text: &str, name: &str) -> String {
    text.replace(&format!("%%{name}%%"), "")
}

/// Whether the literal token `%%name%%` occurs in `text`.
pub(crate) fn has_literal_tag(text: &str, name: &str) -> bool {
    text.contains(&format!("%%{name}%%"))
}

/// Final sanitation pass: erase any residual token of any known family and
/// collapse runs of blank lines down to a single one. Runs unconditionally
/// as the last stage and is idempotent.
pub fn sanitize_residual_tokens(text: &str) -> String {
    let mut out = text.to_string();
    // Paired block families first so `##cmd##` is not half-eaten by the
    // single `#word` rule.
    for pattern in [
        &*DOUBLE_HASH,
        &*AMPERSAND,
        &*DOLLAR,
        &*BRACES,
        &*BRACKETS,
        &*PERCENT,
        &*HASH_WORD,
    ] {
        out = strip_all(pattern, &out);
    }
    out = BLANK_RUNS.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_every_family() {
        let input = "hola %%vip%% y &&cmd:{a:1}&& y {{x}} y [[f]] y $$d$$ y ##p:{b:2}## y #tag fin";
        let out = sanitize_residual_tokens(input);
        for marker in ["%%", "&&", "{{", "[[", "$$", "##", "#"] {
            assert!(!out.contains(marker), "marker {marker:?} left in {out:?}");
        }
        assert!(out.starts_with("hola"));
        assert!(out.ends_with("fin"));
    }

    #[test]
    fn sanitize_collapses_blank_runs() {
        let out = sanitize_residual_tokens("uno\n\n\n\ndos\n\ntres");
        assert_eq!(out, "uno\n\ndos\n\ntres");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_residual_tokens("a %%x%%\n\n\n\nb [[y]] c");
        let twice = sanitize_residual_tokens(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn collect_payloads_returns_trimmed_groups() {
        let payloads = collect_payloads(&AMPERSAND, "&& uno && texto &&dos&&");
        assert_eq!(payloads, ["uno", "dos"]);
    }

    #[test]
    fn agent_pattern_rejects_long_numbers() {
        assert!(AGENT.is_match("%%12%%"));
        assert!(AGENT.is_match("%%123%%"));
        assert!(!AGENT.is_match("%%1234%%"));
        assert!(!AGENT.is_match("%%12a%%"));
    }
}
