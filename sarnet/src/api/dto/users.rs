//! Account, token, credential and settings DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{double_option, validate_username};
use crate::models::{User, UserCredentials, UserSettings};

// ---------------------------------------------------------------------------
// Tokens & auth
// ---------------------------------------------------------------------------

/// Request body for `POST /api/token/` and `POST /api/auth/login/`.
///
/// `email` accepts either an email address or a username.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct TokenObtainRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct TokenVerifyRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Tokens plus the authenticated user, returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

/// Request body for `POST /api/auth/registration/`.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct RegistrationRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters"))]
    pub password1: String,
    pub password2: String,
    /// Defaults to the local part of `email`.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Request body for `POST /api/users/` (public sign-up).
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 150), custom(function = validate_username))]
    pub username: Option<String>,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Partial update of a user. A provided `password` is re-hashed.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 150), custom(function = validate_username))]
    pub username: Option<String>,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Apply everything except the password, which needs hashing first.
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.trim().to_string();
        }
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(date_of_birth) = self.date_of_birth {
            user.date_of_birth = date_of_birth;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateCredentialsRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(max = 255))]
    pub password_hash: String,
    #[validate(length(max = 255))]
    pub salt: String,
    /// Defaults to `pbkdf2_sha256`.
    #[validate(length(min = 1, max = 50))]
    pub hash_algorithm: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateCredentialsRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: Option<String>,
    #[validate(length(max = 255))]
    pub password_hash: Option<String>,
    #[validate(length(max = 255))]
    pub salt: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub hash_algorithm: Option<String>,
}

impl UpdateCredentialsRequest {
    pub fn apply(self, creds: &mut UserCredentials) {
        if let Some(username) = self.username {
            creds.username = username;
        }
        if let Some(password_hash) = self.password_hash {
            creds.password_hash = password_hash;
        }
        if let Some(salt) = self.salt {
            creds.salt = salt;
        }
        if let Some(hash_algorithm) = self.hash_algorithm {
            creds.hash_algorithm = hash_algorithm;
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct SettingsRequest {
    /// Defaults to 7 on create.
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1"))]
    pub meta_analysis_after_days: Option<i64>,
    /// Defaults to 10 on create.
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1"))]
    pub meta_analysis_after_count: Option<i64>,
}

impl SettingsRequest {
    pub fn apply(self, settings: &mut UserSettings) {
        if let Some(days) = self.meta_analysis_after_days {
            settings.meta_analysis_after_days = days;
        }
        if let Some(count) = self.meta_analysis_after_count {
            settings.meta_analysis_after_count = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_validation() {
        let req: RegistrationRequest = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "password1": "short",
            "password2": "short",
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password1"));
    }

    #[test]
    fn test_update_user_clears_date_of_birth() {
        let mut user = User::new("a@b.co".into(), "a".into(), String::new());
        user.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 2);

        let req: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"first_name": "Ada"})).unwrap();
        req.apply(&mut user);
        assert_eq!(user.first_name, "Ada");
        assert!(user.date_of_birth.is_some());

        let req: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"date_of_birth": null})).unwrap();
        req.apply(&mut user);
        assert!(user.date_of_birth.is_none());
    }

    #[test]
    fn test_update_user_rejects_bad_username() {
        let req = UpdateUserRequest {
            username: Some("not valid!".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_settings_must_be_positive() {
        let req = SettingsRequest {
            meta_analysis_after_days: Some(0),
            meta_analysis_after_count: None,
        };
        assert!(req.validate().is_err());
    }
}
