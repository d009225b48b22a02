//! Validated decoding of model output.
//!
//! Model responses are decoded into strict response types. Decoding never
//! fails outright: it yields [`Decoded::Parsed`] when the text matched the
//! schema and [`Decoded::Fallback`] carrying a caller-supplied default
//! otherwise, so callers can log the degrade and move on.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

/// Leading enumeration marker: `1.`, `2)`, `-`, `*`, `+`, or a bullet.
///
/// Numbered markers may touch the item (`1.Foo`); symbol markers need a
/// following space so `-5 degrees` and `**bold**` survive.
static LIST_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)](\s*)|[-*+\u{2022}](?:\s+|$))").ok());

/// Outcome of decoding model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<T> {
    /// The output matched the expected schema.
    Parsed(T),
    /// The output was unusable; the value is the fallback default.
    Fallback(T),
}

impl<T> Decoded<T> {
    /// Returns the carried value regardless of how it was obtained.
    pub fn into_inner(self) -> T {
        match self {
            Self::Parsed(v) | Self::Fallback(v) => v,
        }
    }

    /// Returns `true` when the value is a fallback default.
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Maps a parsed value, keeping the tag. Returns `Fallback(default)`
    /// when `f` rejects the parsed value.
    pub fn and_then<U>(self, default: U, f: impl FnOnce(T) -> Option<U>) -> Decoded<U> {
        match self {
            Self::Parsed(v) => f(v).map_or(Decoded::Fallback(default), Decoded::Parsed),
            Self::Fallback(_) => Decoded::Fallback(default),
        }
    }
}

/// Strips a surrounding markdown code fence, if any.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}

/// Decodes JSON model output into `T`, falling back to `default`.
pub fn decode_json<T: DeserializeOwned>(content: &str, default: T) -> Decoded<T> {
    match serde_json::from_str::<T>(strip_code_fence(content)) {
        Ok(value) => Decoded::Parsed(value),
        Err(e) => {
            tracing::debug!(error = %e, "model output did not match schema");
            Decoded::Fallback(default)
        }
    }
}

fn strip_marker(line: &str) -> &str {
    let Some(caps) = LIST_MARKER.as_ref().and_then(|re| re.captures(line)) else {
        return line;
    };
    let Some(marker) = caps.get(0) else {
        return line;
    };
    let rest = &line[marker.end()..];
    // `3.5 billion`: a number glued to more digits is a decimal, not a marker
    let glued = caps.get(1).is_some_and(|gap| gap.as_str().is_empty());
    if glued && rest.starts_with(|c: char| c.is_ascii_digit()) {
        return line;
    }
    rest
}

/// Splits free-text list output into items.
///
/// Each line loses its enumeration marker and surrounding whitespace;
/// lines left empty are dropped.
#[must_use]
pub fn list_items(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| strip_marker(line).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use test_case::test_case;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Pair {
        a: u32,
        b: u32,
    }

    const DEFAULT: Pair = Pair { a: 0, b: 0 };

    #[test]
    fn test_decode_valid() {
        let decoded = decode_json(r#"{"a": 1, "b": 2}"#, DEFAULT);
        assert_eq!(decoded, Decoded::Parsed(Pair { a: 1, b: 2 }));
    }

    #[test]
    fn test_decode_code_block() {
        let decoded = decode_json("```json\n{\"a\": 3, \"b\": 4}\n```", DEFAULT);
        assert_eq!(decoded.into_inner(), Pair { a: 3, b: 4 });
    }

    #[test]
    fn test_decode_missing_field_falls_back() {
        let decoded = decode_json(r#"{"a": 1}"#, DEFAULT);
        assert!(decoded.is_fallback());
        assert_eq!(decoded.into_inner(), DEFAULT);
    }

    #[test]
    fn test_decode_garbage_falls_back() {
        assert!(decode_json("not json at all", DEFAULT).is_fallback());
    }

    #[test]
    fn test_and_then_rejects() {
        let decoded = Decoded::Parsed(5_u32).and_then(0_u32, |v| (v > 10).then_some(v));
        assert_eq!(decoded, Decoded::Fallback(0));
        let decoded = Decoded::Parsed(50_u32).and_then(0_u32, |v| (v > 10).then_some(v));
        assert_eq!(decoded, Decoded::Parsed(50));
    }

    #[test_case("1. rust async", "rust async" ; "numbered dot")]
    #[test_case("2) tokio runtime", "tokio runtime" ; "numbered paren")]
    #[test_case("- bullet item", "bullet item" ; "dash")]
    #[test_case("* star item", "star item" ; "star")]
    #[test_case("\u{2022} dot item", "dot item" ; "unicode bullet")]
    #[test_case("   10. indented", "indented" ; "indented two digit")]
    #[test_case("3.5 billion users", "3.5 billion users" ; "decimal kept")]
    #[test_case("**Bold** start", "**Bold** start" ; "emphasis kept")]
    #[test_case("1.Foo", "Foo" ; "numbered dot without space")]
    #[test_case("2)bar baz", "bar baz" ; "numbered paren without space")]
    #[test_case("10.000 visitors", "10.000 visitors" ; "thousands separator kept")]
    #[test_case("-5 degrees", "-5 degrees" ; "negative number kept")]
    fn test_list_marker_stripping(line: &str, expected: &str) {
        assert_eq!(list_items(line), vec![expected.to_string()]);
    }

    #[test]
    fn test_list_items_drops_empty_lines() {
        let items = list_items("1. first\n\n   \n2. \n- second\n");
        assert_eq!(items, vec!["first".to_string(), "second".to_string()]);
    }
}
