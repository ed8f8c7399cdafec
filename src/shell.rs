//! POSIX shell quoting and splitting.
//!
//! Command lines emitted into build files are consumed by `/bin/sh`, so any
//! argument that contains shell metacharacters must be quoted. The functions
//! here implement the quoting contract used by the graph writer: `escape`
//! produces the quote-safe inner text plus a flag saying whether wrapping
//! quotes are required, and `quote_escaped` applies the wrapping. Splitting
//! (for environment-seeded flag lists and probe output) delegates to `shlex`.

use std::sync::OnceLock;

use regex::Regex;

/// Characters that are safe to leave unquoted in a POSIX shell word.
fn bad_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w@%+=:,./-]").expect("static regex"))
}

/// Escape a string for embedding inside single quotes.
///
/// Returns the escaped text and whether the result needs to be wrapped in
/// quotes to be a single shell word. Empty strings always need quoting.
pub fn escape(s: &str) -> (String, bool) {
    if s.is_empty() {
        return (String::new(), true);
    }
    if !bad_chars().is_match(s) {
        return (s.to_string(), false);
    }
    (s.replace('\'', r"'\''"), true)
}

/// Wrap previously escaped text in single quotes if `escaped` says so.
pub fn quote_escaped(s: &str, escaped: bool) -> String {
    if escaped {
        format!("'{}'", s)
    } else {
        s.to_string()
    }
}

/// Quote a raw string as a single shell word, reporting whether quoting
/// was applied.
pub fn quote_info(s: &str) -> (String, bool) {
    let (escaped, needs_quote) = escape(s);
    (quote_escaped(&escaped, needs_quote), needs_quote)
}

/// Quote a raw string as a single shell word.
pub fn quote(s: &str) -> String {
    quote_info(s).0
}

/// Split a string into shell tokens.
///
/// Malformed input (an unterminated quote) yields no tokens; callers treat
/// the result as an empty flag list.
pub fn split(s: &str) -> Vec<String> {
    shlex::split(s).unwrap_or_default()
}
