//! Glob-style matching of selector patterns.
//!
//! Patterns are literal strings in which `*` matches any run of characters,
//! including the empty one. Matching is case-sensitive and covers the whole
//! value.

/// Returns true when `value` matches `pattern`.
#[must_use]
pub fn wildcard_matches(pattern: &str, value: &str) -> bool {
    let Some((prefix, rest_pattern)) = pattern.split_once('*') else {
        return pattern == value;
    };
    let (middle, suffix) = rest_pattern.rsplit_once('*').unwrap_or(("", rest_pattern));

    let Some(rest) = value.strip_prefix(prefix) else {
        return false;
    };
    let Some(mut rest) = rest.strip_suffix(suffix) else {
        return false;
    };

    // Leftmost placement of each middle segment leaves the most room for the
    // ones after it.
    for segment in middle.split('*').filter(|segment| !segment.is_empty()) {
        match rest.find(segment) {
            Some(index) => rest = &rest[index + segment.len()..],
            None => return false,
        }
    }
    true
}

/// Returns true when `pattern` is absent or matches `value`.
#[must_use]
pub fn optional_matches(pattern: Option<&str>, value: &str) -> bool {
    pattern.is_none_or(|pattern| wildcard_matches(pattern, value))
}
