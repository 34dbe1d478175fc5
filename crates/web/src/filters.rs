//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Words kept by [`excerpt`] when no count is given in the template.
pub const EXCERPT_WORDS: usize = 25;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// First [`EXCERPT_WORDS`] words of the text.
///
/// Usage in templates: `{{ store.description|excerpt }}`
#[askama::filter_fn]
pub fn excerpt(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(first_words(&value.to_string(), EXCERPT_WORDS))
}

/// Five-star rating as filled and empty stars.
///
/// Usage in templates: `{{ review.rating.stars()|stars }}`
#[askama::filter_fn]
pub fn stars(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let filled = value.to_string().parse::<usize>().unwrap_or(0).min(5);
    Ok(format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)))
}

/// Join words, dropping the rest.
#[must_use]
pub fn first_words(text: &str, count: usize) -> String {
    text.split_whitespace()
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_words_truncates() {
        let text = (1..=30).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let cut = first_words(&text, EXCERPT_WORDS);
        assert_eq!(cut.split(' ').count(), 25);
        assert!(cut.ends_with("25"));
    }

    #[test]
    fn test_first_words_collapses_whitespace() {
        assert_eq!(first_words("  a\n\nb   c ", 5), "a b c");
        assert_eq!(first_words("", 5), "");
    }
}
