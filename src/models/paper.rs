//! Paper model representing one entry of a Google Scholar alert.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Number of characters shown as the collapsed abstract summary.
pub const FIRST_LINE_CHARS: usize = 80;

/// Abstract snippet of a paper, pre-split for the collapsible report block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstract {
    /// Abstract text as found in the message, whitespace-trimmed
    pub full: String,

    /// First [`FIRST_LINE_CHARS`] characters of `full`, newlines removed
    pub first_line: String,

    /// Remainder of `full` after `first_line`, newlines removed
    pub rest_lines: String,
}

impl Abstract {
    /// Build an abstract from its full text, computing the summary split.
    pub fn new(full: impl Into<String>) -> Self {
        let full = full.into();
        let (first_line, rest_lines) = split_first_line(&full, FIRST_LINE_CHARS);
        Self {
            full,
            first_line,
            rest_lines,
        }
    }

    /// Whether there is any abstract text at all.
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

/// Remove newlines, then split after `n` characters.
///
/// Counts Unicode scalar values so the cut never lands inside a code point.
pub fn split_first_line(text: &str, n: usize) -> (String, String) {
    let cleaned: String = text.chars().filter(|c| *c != '\n').collect();
    match cleaned.char_indices().nth(n) {
        Some((idx, _)) => (cleaned[..idx].to_string(), cleaned[idx..].to_string()),
        None => (cleaned, String::new()),
    }
}

/// A paper mentioned in an alert message.
///
/// Two papers are the same paper when title and URL match; the abstract is
/// carried along but does not take part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Target URL, with the Scholar redirect removed
    pub url: String,

    /// Abstract snippet
    pub r#abstract: Abstract,
}

impl Paper {
    /// Create a new paper
    pub fn new(title: impl Into<String>, url: impl Into<String>, r#abstract: Abstract) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            r#abstract,
        }
    }
}

impl PartialEq for Paper {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title && self.url == other.url
    }
}

impl Eq for Paper {}

impl Hash for Paper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.title.hash(state);
        self.url.hash(state);
    }
}

impl std::fmt::Display for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.title, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_short_abstract_has_no_rest() {
        let abs = Abstract::new("A short abstract.");
        assert_eq!(abs.first_line, "A short abstract.");
        assert_eq!(abs.rest_lines, "");
        assert!(!abs.is_empty());
    }

    #[test]
    fn test_empty_abstract() {
        let abs = Abstract::new("");
        assert!(abs.is_empty());
        assert_eq!(abs.first_line, "");
        assert_eq!(abs.rest_lines, "");
    }

    #[test]
    fn test_long_abstract_split_at_80_chars() {
        let text = "x".repeat(100);
        let abs = Abstract::new(text.clone());
        assert_eq!(abs.first_line.chars().count(), 80);
        assert_eq!(abs.rest_lines.chars().count(), 20);
        assert_eq!(abs.full, text);
    }

    #[test]
    fn test_exactly_80_chars() {
        let text = "y".repeat(80);
        let (first, rest) = split_first_line(&text, 80);
        assert_eq!(first, text);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_newlines_removed_before_split() {
        let text = format!("{}\n{}", "a".repeat(50), "b".repeat(50));
        let abs = Abstract::new(text.clone());
        let cleaned = text.replace('\n', "");

        assert_eq!(abs.first_line.chars().count(), 80);
        assert!(!abs.first_line.contains('\n'));
        assert_eq!(format!("{}{}", abs.first_line, abs.rest_lines), cleaned);
        // full keeps the original text
        assert!(abs.full.contains('\n'));
    }

    #[test]
    fn test_split_is_char_aware() {
        let text = "é".repeat(90);
        let (first, rest) = split_first_line(&text, 80);
        assert_eq!(first.chars().count(), 80);
        assert_eq!(rest.chars().count(), 10);
    }

    #[test]
    fn test_equality_ignores_abstract() {
        let a = Paper::new("Title", "http://example.com", Abstract::new("one"));
        let b = Paper::new("Title", "http://example.com", Abstract::new("two"));
        let c = Paper::new("Title", "http://example.org", Abstract::new("one"));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Paper> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
