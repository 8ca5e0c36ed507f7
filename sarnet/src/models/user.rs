use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An account. Everything else in the schema hangs off a user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,
    /// Media-relative path of the uploaded avatar.
    pub avatar: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    #[schema(value_type = String)]
    pub date_joined: DateTime<Utc>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            username,
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            avatar: None,
            is_active: true,
            is_verified: false,
            is_superuser: false,
            date_joined: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Third-party platform login stored for a user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserCredentials {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub salt: String,
    pub hash_algorithm: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_HASH_ALGORITHM: &str = "pbkdf2_sha256";

/// Per-user thresholds that trigger meta analysis.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserSettings {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub meta_analysis_after_days: i64,
    pub meta_analysis_after_count: i64,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub const DEFAULT_AFTER_DAYS: i64 = 7;
    pub const DEFAULT_AFTER_COUNT: i64 = 10;

    pub fn defaults_for(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            meta_analysis_after_days: Self::DEFAULT_AFTER_DAYS,
            meta_analysis_after_count: Self::DEFAULT_AFTER_COUNT,
            created_at: now,
            updated_at: now,
        }
    }
}
