// ABOUTME: Diacritic-insensitive normalization for recipe search columns
// ABOUTME: Builds escaped LIKE patterns from user-supplied search text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Escape character used in LIKE patterns built by [`like_pattern`]
pub const LIKE_ESCAPE: char = '\\';

/// Lowercase `text` and strip diacritics
///
/// The value is stored next to the original column (`name_search`,
/// `description_search`) so that `"Kuře"` is found by `"kure"`.
#[must_use]
pub fn normalize_search_text(text: &str) -> String {
    text.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Substring LIKE pattern for a normalized search term
///
/// `%` and `_` typed by the user match literally.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let normalized = normalize_search_text(term.trim());
    let mut pattern = String::with_capacity(normalized.len() + 2);
    pattern.push('%');
    for ch in normalized.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics_and_lowercases() {
        assert_eq!(normalize_search_text("Svíčková na Smetaně"), "svickova na smetane");
        assert_eq!(normalize_search_text("Crème Brûlée"), "creme brulee");
        assert_eq!(normalize_search_text("plain"), "plain");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("  Kuře "), "%kure%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
