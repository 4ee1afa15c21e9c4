// ABOUTME: Unified error types with fixed error codes and HTTP status mapping
// ABOUTME: Translates database constraint failures and renders JSON error bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Unified Error Handling System
//!
//! Every failure that reaches a client is tagged with an [`ErrorCode`]. The code
//! decides the HTTP status centrally, so handlers never pick status codes for
//! error paths themselves. Validation failures carry a per-field map of
//! message keys (`required`, `maxLength`, ...) that clients translate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::messages;

/// Per-field validation or constraint messages keyed by the camelCase field name
pub type FieldErrors = BTreeMap<String, String>;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Unexpected failure without a more specific code
    #[serde(rename = "GENERAL_ERROR")]
    GeneralError,
    /// Database failure that is not a constraint violation
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    /// Requested or referenced row does not exist
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// Request body, query or path failed validation
    #[serde(rename = "VALIDATION_FAILED")]
    ValidationFailed,
    /// Wrong username or password
    #[serde(rename = "INVALID_CREDENTIALS")]
    InvalidCredentials,
    /// Authenticated user lacks the required role
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    /// Token or reset key is past its validity
    #[serde(rename = "EXPIRED_TOKEN")]
    ExpiredToken,
    /// Token missing, malformed or of the wrong kind
    #[serde(rename = "INVALID_TOKEN")]
    InvalidToken,
    /// Unique index violated
    #[serde(rename = "UNIQUE_CONSTRAINT_ERROR")]
    UniqueConstraintError,
    /// Foreign key violated (missing reference or row still referenced)
    #[serde(rename = "CONSTRAINT_FAILED")]
    ConstraintFailed,
    /// Mail transport rejected the message
    #[serde(rename = "UNABLE_TO_SEND_EMAIL")]
    UnableToSendEmail,
    /// No account matches the submitted email
    #[serde(rename = "ACCOUNT_DOESNT_EXIST")]
    AccountDoesntExist,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 401 Unauthorized
            Self::InvalidCredentials | Self::ExpiredToken | Self::InvalidToken => 401,

            // 403 Forbidden
            Self::Forbidden => 403,

            // 404 Not Found
            Self::NotFound | Self::AccountDoesntExist => 404,

            // 409 Conflict
            Self::UniqueConstraintError | Self::ConstraintFailed => 409,

            // 422 Unprocessable Entity
            Self::ValidationFailed => 422,

            // 503 Service Unavailable
            Self::UnableToSendEmail => 503,

            // 500 Internal Server Error
            Self::GeneralError | Self::DatabaseError => 500,
        }
    }

    /// Wire representation of the code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralError => "GENERAL_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden => "FORBIDDEN",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UniqueConstraintError => "UNIQUE_CONSTRAINT_ERROR",
            Self::ConstraintFailed => "CONSTRAINT_FAILED",
            Self::UnableToSendEmail => "UNABLE_TO_SEND_EMAIL",
            Self::AccountDoesntExist => "ACCOUNT_DOESNT_EXIST",
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::GeneralError => "An internal server error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::NotFound => "The requested resource was not found",
            Self::ValidationFailed => "The submitted data is invalid",
            Self::InvalidCredentials => "Invalid username or password",
            Self::Forbidden => "You do not have permission to perform this action",
            Self::ExpiredToken => "The token has expired",
            Self::InvalidToken => "The token is missing or invalid",
            Self::UniqueConstraintError => "A record with the same value already exists",
            Self::ConstraintFailed => "The operation violates a reference between records",
            Self::UnableToSendEmail => "The email could not be sent",
            Self::AccountDoesntExist => "No account exists for this email",
        }
    }

    /// Whether the client is allowed to see the raw message
    ///
    /// Server-side failures only expose the generic description.
    #[must_use]
    pub const fn exposes_message(&self) -> bool {
        !matches!(self, Self::GeneralError | Self::DatabaseError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Per-field message keys for validation and unique violations
    pub fields: Option<FieldErrors>,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    /// Attach per-field messages
    #[must_use]
    pub fn with_fields(mut self, fields: FieldErrors) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Per-field message keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let message = if error.code.exposes_message() {
            error.message
        } else {
            error.code.description().to_owned()
        };
        Self {
            code: error.code,
            message,
            fields: error.fields,
        }
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found", resource.into()))
    }

    /// Validation failure with per-field message keys
    #[must_use]
    pub fn validation(fields: FieldErrors) -> Self {
        Self::new(ErrorCode::ValidationFailed, "Validation failed").with_fields(fields)
    }

    /// Validation failure on a single field
    pub fn invalid_field(field: impl Into<String>, key: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), key.into());
        Self::validation(fields)
    }

    /// Wrong username or password
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid username or password")
    }

    /// Caller lacks the required role
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(ErrorCode::Forbidden, "Insufficient role for this operation")
    }

    /// Token or key past its validity
    pub fn expired_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExpiredToken, message)
    }

    /// Token missing, malformed or of the wrong kind
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    /// Unique index violation on the given fields
    #[must_use]
    pub fn unique_violation(fields: FieldErrors) -> Self {
        Self::new(ErrorCode::UniqueConstraintError, "Unique constraint violated").with_fields(fields)
    }

    /// Foreign key violation
    pub fn constraint_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConstraintFailed, message)
    }

    /// Mail transport failure
    pub fn unable_to_send_email(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnableToSendEmail, message)
    }

    /// No account for an email address
    #[must_use]
    pub fn account_doesnt_exist() -> Self {
        Self::new(ErrorCode::AccountDoesntExist, "No account exists for this email")
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GeneralError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

/// Extract the violated columns from a driver message such as
/// `UNIQUE constraint failed: recipes.name, recipes.id`
///
/// Column names are converted to the camelCase names used in request bodies.
#[must_use]
pub fn unique_violation_fields(driver_message: &str) -> FieldErrors {
    let columns = driver_message
        .rsplit_once(':')
        .map_or("", |(_, columns)| columns);

    columns
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(|column| {
            let name = column.rsplit_once('.').map_or(column, |(_, name)| name);
            (to_camel_case(name), messages::NOT_UNIQUE.to_owned())
        })
        .collect()
}

fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        let translated = match &error {
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation => {
                    Some(Self::unique_violation(unique_violation_fields(db.message())))
                }
                ErrorKind::ForeignKeyViolation => Some(Self::constraint_failed(format!(
                    "Referenced record is missing or still in use: {}",
                    db.message()
                ))),
                _ => None,
            },
            sqlx::Error::RowNotFound => Some(Self::not_found("Record")),
            _ => None,
        };

        translated
            .unwrap_or_else(|| Self::database(format!("Database operation failed: {error}")))
            .with_source(error)
    }
}

#[cfg(feature = "http-response")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                code = %self.code,
                error = %self,
                source = ?self.source,
                "Request failed"
            );
        } else {
            tracing::debug!(code = %self.code, error = %self, "Request rejected");
        }

        (status, axum::Json(ErrorResponse::from(self))).into_response()
    }
}
