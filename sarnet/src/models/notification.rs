use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub notification_type: String,
    pub notification_channel: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}
