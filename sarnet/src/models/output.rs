use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProcessingOutput {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub output_id: String,
    pub source_format: String,
    pub text: String,
    pub storage_path: String,
    #[schema(value_type = Object)]
    pub meta_data: serde_json::Value,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SourceDownload {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub source_id: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}
