mod password;
mod token;

pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
pub use token::{Claims, TokenPair, TokenService, TokenType};

use regex::Regex;
use std::sync::LazyLock;

use crate::db::UserStore;
use crate::error::{Result, SarnetError};

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]+$").expect("static pattern")
});

pub const USERNAME_RULE: &str = "Username can only contain letters, numbers, and underscores";

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub const MIN_PASSWORD_LEN: usize = 8;

/// The rule request bodies enforce through `validator`, for callers that
/// set passwords without one (the `create-superuser` command).
pub fn check_password_length(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SarnetError::Validation(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Derive a username candidate from an email's local part, keeping only
/// characters usernames allow.
pub fn username_base_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

/// `base` itself if free, otherwise `base1`, `base2`, ... until one is.
pub async fn unique_username<S: UserStore + ?Sized>(store: &S, base: &str) -> Result<String> {
    if !store.username_exists(base).await? {
        return Ok(base.to_string());
    }
    for i in 1..=10_000u32 {
        let candidate = format!("{base}{i}");
        if !store.username_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(SarnetError::Conflict(format!(
        "Could not find a free username for {base}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rule() {
        assert!(is_valid_username("sar_user_01"));
        assert!(!is_valid_username("sar-user"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("émile"));
    }

    #[test]
    fn test_password_length_rule() {
        assert!(check_password_length("12345678").is_ok());
        assert!(matches!(
            check_password_length("1234567"),
            Err(SarnetError::Validation(_))
        ));
        // Counted in characters, not bytes.
        assert!(check_password_length("ééééééé").is_err());
    }

    #[test]
    fn test_username_base_from_email() {
        assert_eq!(username_base_from_email("jane.doe@example.com"), "jane_doe");
        assert_eq!(username_base_from_email("@example.com"), "user");
        assert_eq!(username_base_from_email("radar"), "radar");
    }
}
