use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that happened, optionally tied to a user and a chat session.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Event {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: Option<i64>,
    #[serde(rename = "chat_session")]
    pub chat_session_id: Option<i64>,
    pub event_id: String,
    pub event_type: String,
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// A named behavioral pattern detected for a user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Pattern {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub pattern_id: String,
    pub pattern_name: String,
    pub description: String,
    /// Always within `0.0..=1.0`.
    pub confidence: f64,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl Pattern {
    pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
}

/// A staged event with free-form stage data.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ViaEvent {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub event_id: String,
    pub via_id: String,
    pub image: String,
    pub stage_status: String,
    #[schema(value_type = Object)]
    pub stage_data: serde_json::Value,
    pub message: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}
