use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProcessingJob {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub job_id: String,
    pub job_type: String,
    pub status: JobStatus,
    pub priority: i64,
    #[schema(value_type = String)]
    pub schedule: DateTime<Utc>,
    pub message: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJob {
    pub const CANCELLED_MESSAGE: &'static str = "Cancelled by user";

    /// Only jobs that have not started can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        self.status == JobStatus::Pending
    }
}

/// The outcome payload of a job. A job has at most one result.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobResult {
    pub id: i64,
    #[serde(rename = "job")]
    pub job_id: i64,
    pub result_id: String,
    #[schema(value_type = Object)]
    pub result_data: serde_json::Value,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}
