//! Text normalization and transliteration primitives
//!
//! Everything downstream (keyword extraction, ranking, greeting matching,
//! cache keys) operates on the normalized form produced here, so the
//! normalizer must be deterministic and idempotent.

use unicode_normalization::UnicodeNormalization;

/// Lowercase, replace every non-alphanumeric character with a space,
/// collapse whitespace runs and trim.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Split normalized text into tokens.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Best-effort ASCII transliteration for edit-distance comparison:
/// NFKD decomposition, then drop everything outside ASCII. Accented
/// Latin folds to its base letter; scripts with no ASCII decomposition
/// drop out entirely, which callers must tolerate (empty string).
pub fn transliterate(input: &str) -> String {
    input.nfkd().filter(char::is_ascii).collect()
}

/// Take the first `max_chars` characters of `input` (char-based, never
/// splits a code point).
pub fn char_prefix(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Conversational lead-ins stripped before keyword extraction so that
/// "tell me about hostel fees" and "hostel fees" extract identically.
const LEAD_INS: &[&str] = &[
    "tell me about",
    "tell me",
    "what is the",
    "what is",
    "what are the",
    "what are",
    "how do i",
    "how to",
    "i want to know about",
    "i want to know",
    "can you tell me",
    "please",
];

/// Strip known conversational lead-ins from the front of an already
/// normalized query. Applied repeatedly, so "please tell me about fees"
/// reduces to "fees". Returns the input unchanged when nothing matches
/// or stripping would leave the query empty.
pub fn strip_lead_in(normalized: &str) -> &str {
    let mut rest = normalized;
    'outer: loop {
        for prefix in LEAD_INS {
            if let Some(tail) = rest.strip_prefix(prefix) {
                // Whole-phrase match only: the prefix must consume the
                // string or end at a word boundary.
                if tail.is_empty() {
                    return rest;
                }
                if tail.starts_with(' ') {
                    rest = tail.trim_start();
                    continue 'outer;
                }
            }
        }
        return rest;
    }
}
