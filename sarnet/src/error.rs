use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SarnetError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    FieldValidation(#[from] validator::ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("{0}")]
    Colorize(String),

    #[error("Colorizer unavailable: {0}")]
    ColorizerUnavailable(String),
}

impl SarnetError {
    /// True for a UNIQUE failure on `table.column`.
    pub fn is_unique_violation(&self, column: &str) -> bool {
        match self {
            SarnetError::Database(e) => e
                .to_string()
                .split("UNIQUE constraint failed: ")
                .nth(1)
                .is_some_and(|rest| {
                    rest.split(',')
                        .any(|c| c.trim_matches(|ch: char| ch.is_whitespace() || ch == '`') == column)
                }),
            _ => false,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SarnetError::NotFound(_) => StatusCode::NOT_FOUND,
            SarnetError::Validation(_) | SarnetError::FieldValidation(_) => {
                StatusCode::BAD_REQUEST
            }
            SarnetError::Json(_) => StatusCode::BAD_REQUEST,
            SarnetError::Database(e) if constraint_violation(e).is_some() => {
                StatusCode::BAD_REQUEST
            }
            SarnetError::Conflict(_) => StatusCode::CONFLICT,
            SarnetError::Unauthorized(_) | SarnetError::Token(_) => StatusCode::UNAUTHORIZED,
            SarnetError::Forbidden(_) => StatusCode::FORBIDDEN,
            SarnetError::ColorizerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SarnetError::Database(_)
            | SarnetError::Io(_)
            | SarnetError::PasswordHash(_)
            | SarnetError::Internal(_)
            | SarnetError::Colorize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Field-level messages for validator failures, keyed by field name.
    pub fn field_errors(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let SarnetError::FieldValidation(errors) = self else {
            return None;
        };

        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({})", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Some(fields)
    }

    /// Message suitable for the response body.
    pub fn public_message(&self) -> String {
        match self {
            SarnetError::NotFound(msg)
            | SarnetError::Validation(msg)
            | SarnetError::Conflict(msg)
            | SarnetError::Unauthorized(msg)
            | SarnetError::Forbidden(msg)
            | SarnetError::Colorize(msg)
            | SarnetError::ColorizerUnavailable(msg) => msg.clone(),
            SarnetError::FieldValidation(_) => "Invalid input".to_string(),
            SarnetError::Json(e) => e.to_string(),
            SarnetError::Token(_) => "Token is invalid or expired".to_string(),
            SarnetError::Database(e) => match constraint_violation(e) {
                Some(msg) => msg,
                None => "An internal error occurred".to_string(),
            },
            _ => "An internal error occurred".to_string(),
        }
    }
}

/// Map SQLite constraint failures onto readable client messages.
fn constraint_violation(error: &libsql::Error) -> Option<String> {
    let text = error.to_string();
    if let Some(rest) = text.split("UNIQUE constraint failed: ").nth(1) {
        let columns: Vec<&str> = rest
            .split(',')
            .map(|c| c.trim_matches(|ch: char| ch.is_whitespace() || ch == '`'))
            .map(|c| c.rsplit('.').next().unwrap_or(c))
            .collect();
        return Some(format!(
            "A record with this {} already exists",
            columns.join(", ")
        ));
    }
    if text.contains("FOREIGN KEY constraint failed") {
        return Some("Referenced record does not exist".to_string());
    }
    if text.contains("CHECK constraint failed") {
        return Some("Value violates a field constraint".to_string());
    }
    None
}

impl IntoResponse for SarnetError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let mut body = json!({
            "error": self.public_message(),
            "code": crate::api::response::ErrorCode::from_status(status),
        });
        if let Some(fields) = self.field_errors() {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, SarnetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Reading {
        #[validate(range(min = 0.0, max = 1.0, message = "Confidence must be between 0 and 1"))]
        confidence: f64,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            SarnetError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SarnetError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SarnetError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SarnetError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SarnetError::Colorize("bad image".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            SarnetError::ColorizerUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_field_errors_carry_messages() {
        let err: SarnetError = Reading { confidence: 1.5 }.validate().unwrap_err().into();
        let fields = err.field_errors().unwrap();
        assert_eq!(
            fields.get("confidence").unwrap(),
            &vec!["Confidence must be between 0 and 1".to_string()]
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_messages_are_masked() {
        let err = SarnetError::Internal("secret path /etc/x".into());
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[test]
    fn test_colorize_error_keeps_raw_message() {
        let err = SarnetError::Colorize("Failed to decode image: unsupported format".into());
        assert_eq!(
            err.public_message(),
            "Failed to decode image: unsupported format"
        );
    }
}
