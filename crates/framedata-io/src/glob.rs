//! Glob patterns shared by the filesystem backends.
//!
//! Matching is done by `globset` with `literal_separator` on, so `*` and `?`
//! never cross a `/`. Backends only decide where listing starts.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::Result;

/// True if `s` contains glob syntax.
pub fn has_magic(s: &str) -> bool {
    s.contains(&['*', '?', '[', '{'][..])
}

/// Compile `pattern` so wildcards stay within one path segment.
pub fn compile(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// Leading part of `pattern` up to (not including) the first segment with
/// glob syntax. Listing starts there.
pub fn literal_prefix(pattern: &str) -> String {
    let prefix: Vec<&str> = segments(pattern).take_while(|s| !has_magic(s)).collect();
    let joined = prefix.join("/");
    if pattern.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Non-empty segments of a `/`-separated path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_stay_within_a_segment() {
        let m = compile("data/cars.csv/*/cars.csv").unwrap();
        assert!(m.is_match("data/cars.csv/2026-01-01T00.00.00.000Z/cars.csv"));
        assert!(!m.is_match("data/cars.csv/v1/x/cars.csv"));
        assert!(!m.is_match("data/cars.csv/v1"));

        let m = compile("/tmp/c?rs.*").unwrap();
        assert!(m.is_match("/tmp/cars.csv"));
        assert!(!m.is_match("/tmp/sub/cars.csv"));
    }

    #[test]
    fn invalid_patterns_are_errors() {
        assert!(compile("data/[abc").is_err());
    }

    #[test]
    fn prefixes_stop_at_the_first_wildcard() {
        assert_eq!(literal_prefix("/tmp/cars.csv/*/cars.csv"), "/tmp/cars.csv");
        assert_eq!(literal_prefix("bucket/a/*"), "bucket/a");
        assert_eq!(literal_prefix("bucket/{a,b}/x"), "bucket");
        assert_eq!(literal_prefix("*/x"), "");
    }
}
