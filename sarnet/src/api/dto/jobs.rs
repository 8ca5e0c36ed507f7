use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::{JobResult, JobStatus, ProcessingJob};

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateJobRequest {
    #[validate(length(min = 1, max = 255))]
    pub job_id: String,
    #[validate(length(min = 1, max = 100))]
    pub job_type: String,
    /// Defaults to `pending`.
    pub status: Option<JobStatus>,
    /// Defaults to 0.
    #[validate(range(min = 0, message = "Priority must be a non-negative integer"))]
    pub priority: Option<i64>,
    /// Defaults to now.
    #[schema(value_type = Option<String>)]
    pub schedule: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: String,
}

impl CreateJobRequest {
    pub fn into_job(self, user_id: i64) -> ProcessingJob {
        let now = Utc::now();
        ProcessingJob {
            id: 0,
            user_id,
            job_id: self.job_id,
            job_type: self.job_type,
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or(0),
            schedule: self.schedule.unwrap_or(now),
            message: self.message,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateJobRequest {
    #[validate(length(min = 1, max = 255))]
    pub job_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub job_type: Option<String>,
    pub status: Option<JobStatus>,
    #[validate(range(min = 0, message = "Priority must be a non-negative integer"))]
    pub priority: Option<i64>,
    #[schema(value_type = Option<String>)]
    pub schedule: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl UpdateJobRequest {
    pub fn apply(self, job: &mut ProcessingJob) {
        if let Some(job_id) = self.job_id {
            job.job_id = job_id;
        }
        if let Some(job_type) = self.job_type {
            job.job_type = job_type;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(priority) = self.priority {
            job.priority = priority;
        }
        if let Some(schedule) = self.schedule {
            job.schedule = schedule;
        }
        if let Some(message) = self.message {
            job.message = message;
        }
    }
}

/// Filter for `GET /api/jobs/`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
}

/// A job with its result inlined, when one exists.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: ProcessingJob,
    pub result: Option<JobResult>,
}

#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateJobResultRequest {
    /// Id of one of the caller's jobs.
    pub job: i64,
    #[validate(length(min = 1, max = 255))]
    pub result_id: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub result_data: Value,
}

impl CreateJobResultRequest {
    pub fn into_result(self) -> JobResult {
        let now = Utc::now();
        JobResult {
            id: 0,
            job_id: self.job,
            result_id: self.result_id,
            result_data: self.result_data,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_job_defaults() {
        let req: CreateJobRequest = serde_json::from_value(serde_json::json!({
            "job_id": "j1",
            "job_type": "colorize",
        }))
        .unwrap();
        req.validate().unwrap();
        let job = req.into_job(5);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.priority, 0);
        assert!(job.is_cancellable());
    }

    #[test]
    fn test_negative_priority_rejected() {
        let req = UpdateJobRequest {
            priority: Some(-1),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(
            errors.field_errors()["priority"][0].message.as_deref(),
            Some("Priority must be a non-negative integer")
        );
    }

    #[test]
    fn test_unknown_status_fails_to_parse() {
        let result: Result<CreateJobRequest, _> = serde_json::from_value(serde_json::json!({
            "job_id": "j1",
            "job_type": "x",
            "status": "cancelled",
        }));
        assert!(result.is_err());
    }
}
