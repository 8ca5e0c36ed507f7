use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation or interaction record.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Session {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub session_id: String,
    pub username: String,
    pub text: String,
    #[serde(rename = "type")]
    pub session_type: String,
    #[schema(value_type = String)]
    pub date: DateTime<Utc>,
    /// Number of images attached to this session.
    pub total_cnt: i64,
    pub user_status: String,
    #[schema(value_type = Option<String>)]
    pub user_status_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub post_analysis_at: Option<DateTime<Utc>>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// An uploaded image attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Image {
    pub id: i64,
    #[serde(rename = "session")]
    pub session_id: i64,
    /// External user identifier recorded with the upload.
    pub user_id: String,
    pub image_id: String,
    /// Media-relative path of the stored file.
    pub storage_path: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}
