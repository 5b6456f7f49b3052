use lazy_static::lazy_static;
use regex::Regex;

/// Terms shorter than this (in characters) are never indexed.
pub const MIN_TERM_CHARS: usize = 3;

// `\w` alone misses other-number characters such as "²" and "½", which
// count as word characters for the stripping rule.
lazy_static! {
    static ref EDGES: Regex = Regex::new(r"^[^\w\p{No}]+|[^\w\p{No}]+$").expect("valid regex");
}

fn is_separator(b: &u8) -> bool {
    matches!(*b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Normalize one raw token: strict UTF-8 decode, lowercase, strip leading and
/// trailing non-word runs. Inner punctuation survives ("don't", "e-mail").
/// Returns `None` for tokens that fail to decode or end up too short.
pub fn normalize(token: &[u8]) -> Option<String> {
    let decoded = std::str::from_utf8(token).ok()?;
    let lowered = decoded.to_lowercase();
    let term = EDGES.replace_all(&lowered, "");
    if term.chars().count() < MIN_TERM_CHARS {
        return None;
    }
    Some(term.into_owned())
}

/// Split a raw line on ASCII whitespace and normalize every token.
pub fn tokenize(line: &[u8]) -> Vec<String> {
    line.split(is_separator)
        .filter(|t| !t.is_empty())
        .filter_map(normalize)
        .collect()
}
