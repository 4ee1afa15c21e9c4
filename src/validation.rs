// ABOUTME: Field-level validation collector producing VALIDATION_FAILED errors
// ABOUTME: Records the first failing rule per field as a message key such as maxLength
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Request validation
//!
//! Request bodies are checked field by field and every failure is collected,
//! so a client receives all problems at once. Nested fields use dotted paths
//! (`recipeSections.0.ingredients.2.unitId`).

use std::sync::LazyLock;

use recipe_core::constants::{limits, messages};
use recipe_core::errors::{AppError, AppResult, FieldErrors};
use regex::Regex;

/// Collects field failures for one request
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    /// Start an empty validation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; only the first failure per field is kept
    pub fn fail(&mut self, field: impl Into<String>, key: &str) -> &mut Self {
        self.errors.entry(field.into()).or_insert_with(|| key.to_owned());
        self
    }

    /// Record `key` for `field` unless `ok` holds
    pub fn check(&mut self, field: &str, ok: bool, key: &str) -> &mut Self {
        if !ok {
            self.fail(field, key);
        }
        self
    }

    /// Key that the body must contain, even when its value may be empty
    pub fn present(&mut self, field: &str, present: bool) -> &mut Self {
        self.check(field, present, messages::REQUIRED)
    }

    /// Non-empty text of at most `max` characters
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, messages::REQUIRED)
        } else {
            self.max_length(field, value, max)
        }
    }

    /// Text of at most `max` characters
    pub fn max_length(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        self.check(field, value.chars().count() <= max, messages::MAX_LENGTH)
    }

    /// Optional text of at most `max` characters
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.max_length(field, value, max);
        }
        self
    }

    /// Text whose length lies within `min..=max`
    pub fn length_between(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let length = value.chars().count();
        if length < min {
            self.fail(field, messages::MIN_LENGTH)
        } else {
            self.check(field, length <= max, messages::MAX_LENGTH)
        }
    }

    /// Integer within `min..=max`
    pub fn between(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min {
            self.fail(field, messages::MIN)
        } else {
            self.check(field, value <= max, messages::MAX)
        }
    }

    /// Integer of at least `min`
    pub fn at_least(&mut self, field: &str, value: i64, min: i64) -> &mut Self {
        self.check(field, value >= min, messages::MIN)
    }

    /// Reference to a persisted row (positive id)
    pub fn id(&mut self, field: &str, value: i64) -> &mut Self {
        self.at_least(field, value, 1)
    }

    /// Finite number of at least `min`
    pub fn number_at_least(&mut self, field: &str, value: f64, min: f64) -> &mut Self {
        if value.is_finite() {
            self.check(field, value >= min, messages::MIN)
        } else {
            self.fail(field, messages::INVALID_VALUE)
        }
    }

    /// Value taken from a fixed set
    pub fn allowed(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        self.check(field, allowed.contains(&value), messages::ALLOWED)
    }

    /// Lowercase alphanumeric username of allowed length
    pub fn username(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            return self.fail(field, messages::REQUIRED);
        }
        self.length_between(field, value, limits::USERNAME_MIN, limits::USERNAME_MAX);
        self.check(
            field,
            value.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit()),
            messages::INVALID_VALUE,
        )
    }

    /// Password of allowed length containing lowercase, uppercase and digit
    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            return self.fail(field, messages::REQUIRED);
        }
        self.length_between(field, value, limits::PASSWORD_MIN, limits::PASSWORD_MAX);
        let strong = value.chars().any(|ch| ch.is_lowercase())
            && value.chars().any(|ch| ch.is_uppercase())
            && value.chars().any(|ch| ch.is_ascii_digit());
        self.check(field, strong, messages::SIMPLE_PASSWORD)
    }

    /// Email address of allowed length
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.fail(field, messages::REQUIRED);
        }
        self.max_length(field, value, limits::EMAIL_MAX);
        self.check(field, is_email(value), messages::INVALID_VALUE)
    }

    /// Optional first or last name
    pub fn person_name(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.length_between(field, value, limits::PERSON_NAME_MIN, limits::PERSON_NAME_MAX);
        }
        self
    }

    /// Whether any failure was recorded
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Finish validation
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` carrying every recorded field failure
    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.errors))
        }
    }
}

/// Dotted path of a field inside a list item
#[must_use]
pub fn nested_field(list: &str, index: usize, field: &str) -> String {
    format!("{list}.{index}.{field}")
}

static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // Matches: local@domain.tld without whitespace
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok()
});

fn is_email(value: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

/// Trim surrounding whitespace, mapping blank strings to `None`
#[must_use]
pub fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::errors::ErrorCode;

    fn fields(validator: Validator) -> FieldErrors {
        match validator.finish() {
            Ok(()) => FieldErrors::new(),
            Err(error) => {
                assert_eq!(error.code, ErrorCode::ValidationFailed);
                error.fields.unwrap_or_default()
            }
        }
    }

    #[test]
    fn test_required_and_max_length() {
        let mut v = Validator::new();
        v.required_text("name", "   ", 80);
        v.required_text("description", &"x".repeat(161), 160);
        v.required_text("method", "fine", 80);

        let fields = fields(v);
        assert_eq!(fields["name"], "required");
        assert_eq!(fields["description"], "maxLength");
        assert!(!fields.contains_key("method"));
    }

    #[test]
    fn test_first_failure_per_field_wins() {
        let mut v = Validator::new();
        v.username("username", "AB");
        assert_eq!(fields(v)["username"], "minLength");
    }

    #[test]
    fn test_username_rules() {
        let mut v = Validator::new();
        v.username("a", "chef42").username("b", "Chef42").username("c", "");
        let fields = fields(v);
        assert!(!fields.contains_key("a"));
        assert_eq!(fields["b"], "invalidValue");
        assert_eq!(fields["c"], "required");
    }

    #[test]
    fn test_password_policy() {
        let mut v = Validator::new();
        v.password("weak", "alllowercase1")
            .password("short", "Ab1")
            .password("good", "Test1234");
        let fields = fields(v);
        assert_eq!(fields["weak"], "simplePassword");
        assert_eq!(fields["short"], "minLength");
        assert!(!fields.contains_key("good"));
    }

    #[test]
    fn test_numbers() {
        let mut v = Validator::new();
        v.between("serves", 0, 1, 100)
            .between("big", 101, 1, 100)
            .number_at_least("value", -0.5, 0.0)
            .number_at_least("nan", f64::NAN, 0.0)
            .id("unitId", 3);
        let fields = fields(v);
        assert_eq!(fields["serves"], "min");
        assert_eq!(fields["big"], "max");
        assert_eq!(fields["value"], "min");
        assert_eq!(fields["nan"], "invalidValue");
        assert!(!fields.contains_key("unitId"));
    }

    #[test]
    fn test_email_and_nested_paths() {
        let mut v = Validator::new();
        v.email("email", "cook@example.com")
            .email(&nested_field("users", 1, "email"), "not-an-email");
        let fields = fields(v);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["users.1.email"], "invalidValue");
    }

    #[test]
    fn test_trim_optional() {
        assert_eq!(trim_optional(Some("  soup ".into())), Some("soup".into()));
        assert_eq!(trim_optional(Some("   ".into())), None);
        assert_eq!(trim_optional(None), None);
    }
}
