//! Whitespace normalization for scraped text

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::RawValue;

static CONTROL_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\t]+").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Collapse line breaks, tabs and repeated whitespace into single spaces and trim
pub fn normalize_text(text: &str) -> String {
    let spaced = CONTROL_RUN.replace_all(text, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&spaced, " ");
    collapsed.trim().to_string()
}

/// Normalize a value; only text changes, every other kind passes through
pub fn normalize(value: &RawValue) -> RawValue {
    match value {
        RawValue::Text(s) => RawValue::Text(normalize_text(s)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_line_breaks_and_tabs() {
        assert_eq!(normalize_text("a\r\n\tb"), "a b");
        assert_eq!(normalize_text("Maria  Silva\n"), "Maria Silva");
    }

    #[test]
    fn test_trims_and_collapses_spaces() {
        assert_eq!(normalize_text("   RECURSO    ESPECIAL  "), "RECURSO ESPECIAL");
        assert_eq!(normalize_text(" \n \t "), "");
    }

    #[test]
    fn test_non_text_passes_through() {
        assert_eq!(normalize(&RawValue::Integer(3)), RawValue::Integer(3));
        assert_eq!(normalize(&RawValue::Null), RawValue::Null);
        assert_eq!(normalize(&RawValue::Boolean(true)), RawValue::Boolean(true));
        let list = RawValue::List(vec![RawValue::Text("  a  b ".to_string())]);
        assert_eq!(normalize(&list), list);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let normalized = normalize_text("João\tda   Conceição");
        assert_eq!(normalized, "João da Conceição");
        assert_eq!(normalized.chars().count(), 17);
    }
}
