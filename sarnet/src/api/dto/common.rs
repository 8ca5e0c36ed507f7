//! Helpers shared by request DTOs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

static SESSION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static pattern")
});

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn validate_session_id(value: &str) -> Result<(), ValidationError> {
    if SESSION_ID_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_session_id").with_message(
            "Session ID can only contain letters, numbers, hyphens, and underscores".into(),
        ))
    }
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if crate::auth::is_valid_username(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username")
            .with_message(crate::auth::USERNAME_RULE.into()))
    }
}
