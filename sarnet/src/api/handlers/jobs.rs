//! Processing jobs and their results.

use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{
    CreateJobRequest, CreateJobResultRequest, JobFilter, JobResponse, UpdateJobRequest,
};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated, StatusMessage};
use crate::api::state::AppState;
use crate::error::{Result, SarnetError};
use crate::models::{JobResult, JobStatus, ProcessingJob};

use super::{not_found, validated};

async fn with_result(state: &AppState, job: ProcessingJob) -> Result<JobResponse> {
    let result = state.db.get_result_for_job(job.id).await?;
    Ok(JobResponse { job, result })
}

async fn job_page(
    state: &AppState,
    user_id: i64,
    status: Option<JobStatus>,
    query: PageQuery,
) -> Result<Paginated<JobResponse>> {
    let page = query.resolve(&state.config.pagination);
    let (jobs, total) = state.db.list_jobs(user_id, status, page).await?;
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        results.push(with_result(state, job).await?);
    }
    Ok(Paginated::new(results, total, page))
}

/// `GET /api/processing-jobs/`
///
/// Highest priority first, then earliest schedule.
#[utoipa::path(
    get,
    path = "/api/processing-jobs/",
    tag = "jobs",
    operation_id = "jobs.list",
    security(("bearer_auth" = [])),
    params(JobFilter, PageQuery),
    responses(
        (status = 200, description = "Caller's jobs", body = Paginated<JobResponse>),
        (status = 400, description = "Unknown status", body = ApiError),
    )
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(filter): AppQuery<JobFilter>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<JobResponse>>> {
    Ok(ApiResponse::success(
        job_page(&state, user.id, filter.status, query).await?,
    ))
}

/// `GET /api/processing-jobs/pending/`
#[utoipa::path(
    get,
    path = "/api/processing-jobs/pending/",
    tag = "jobs",
    operation_id = "jobs.pending",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's pending jobs", body = Paginated<JobResponse>),
    )
)]
pub async fn pending_jobs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<JobResponse>>> {
    Ok(ApiResponse::success(
        job_page(&state, user.id, Some(JobStatus::Pending), query).await?,
    ))
}

/// `POST /api/processing-jobs/`
#[utoipa::path(
    post,
    path = "/api/processing-jobs/",
    tag = "jobs",
    operation_id = "jobs.create",
    security(("bearer_auth" = [])),
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateJobRequest>,
) -> Result<ApiResponse<JobResponse>> {
    let req = validated(req)?;
    let job = state.db.create_job(&req.into_job(user.id)).await?;
    tracing::debug!(id = job.id, job_id = %job.job_id, status = %job.status, "Job created");
    Ok(ApiResponse::created(JobResponse { job, result: None }))
}

/// `GET /api/processing-jobs/{id}/`
#[utoipa::path(
    get,
    path = "/api/processing-jobs/{id}/",
    tag = "jobs",
    operation_id = "jobs.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job with its result", body = JobResponse),
        (status = 404, description = "Job not found", body = ApiError),
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<JobResponse>> {
    let job = state
        .db
        .get_job(id, user.id)
        .await?
        .ok_or_else(|| not_found("Job", id))?;
    Ok(ApiResponse::success(with_result(&state, job).await?))
}

/// `PATCH /api/processing-jobs/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/processing-jobs/{id}/",
    tag = "jobs",
    operation_id = "jobs.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Job ID")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Job updated", body = JobResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Job not found", body = ApiError),
    )
)]
pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateJobRequest>,
) -> Result<ApiResponse<JobResponse>> {
    let req = validated(req)?;
    let mut job = state
        .db
        .get_job(id, user.id)
        .await?
        .ok_or_else(|| not_found("Job", id))?;
    req.apply(&mut job);
    job.updated_at = Utc::now();
    state.db.update_job(&job).await?;
    Ok(ApiResponse::success(with_result(&state, job).await?))
}

/// `DELETE /api/processing-jobs/{id}/`
#[utoipa::path(
    delete,
    path = "/api/processing-jobs/{id}/",
    tag = "jobs",
    operation_id = "jobs.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Job ID")),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 404, description = "Job not found", body = ApiError),
    )
)]
pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_job(id, user.id).await? {
        return Err(not_found("Job", id));
    }
    Ok(ApiResponse::no_content())
}

/// `POST /api/processing-jobs/{id}/cancel/`
///
/// Only pending jobs can be cancelled; they end up `failed` with a
/// cancellation message.
#[utoipa::path(
    post,
    path = "/api/processing-jobs/{id}/cancel/",
    tag = "jobs",
    operation_id = "jobs.cancel",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job cancelled", body = StatusMessage),
        (status = 400, description = "Job is not pending", body = ApiError),
        (status = 404, description = "Job not found", body = ApiError),
    )
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<StatusMessage>> {
    let job = state
        .db
        .get_job(id, user.id)
        .await?
        .ok_or_else(|| not_found("Job", id))?;

    // A concurrent status change between the read and the update also lands here.
    if !job.is_cancellable() || !state.db.cancel_job(id, user.id).await? {
        return Err(SarnetError::Validation(
            "Cannot cancel running or completed job".to_string(),
        ));
    }

    tracing::info!(id, job_id = %job.job_id, "Job cancelled");
    Ok(ApiResponse::success(StatusMessage::new("Job cancelled")))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// `GET /api/job-results/`
#[utoipa::path(
    get,
    path = "/api/job-results/",
    tag = "jobs",
    operation_id = "jobResults.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Results of the caller's jobs", body = Paginated<JobResult>),
    )
)]
pub async fn list_job_results(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<JobResult>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_job_results(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/job-results/`
#[utoipa::path(
    post,
    path = "/api/job-results/",
    tag = "jobs",
    operation_id = "jobResults.create",
    security(("bearer_auth" = [])),
    request_body = CreateJobResultRequest,
    responses(
        (status = 201, description = "Result stored", body = JobResult),
        (status = 400, description = "Invalid request or unknown job", body = ApiError),
        (status = 409, description = "The job already has a result", body = ApiError),
    )
)]
pub async fn create_job_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateJobResultRequest>,
) -> Result<ApiResponse<JobResult>> {
    let req = validated(req)?;
    if state.db.get_job(req.job, user.id).await?.is_none() {
        return Err(SarnetError::Validation(format!(
            "Job {} does not exist",
            req.job
        )));
    }
    if state.db.get_result_for_job(req.job).await?.is_some() {
        return Err(SarnetError::Conflict(format!(
            "Job {} already has a result",
            req.job
        )));
    }

    let job_id = req.job;
    let result = state
        .db
        .create_job_result(&req.into_result())
        .await
        .map_err(|e| {
            if e.is_unique_violation("job_results.job_id") {
                SarnetError::Conflict(format!("Job {job_id} already has a result"))
            } else {
                e
            }
        })?;
    Ok(ApiResponse::created(result))
}

/// `GET /api/job-results/{id}/`
#[utoipa::path(
    get,
    path = "/api/job-results/{id}/",
    tag = "jobs",
    operation_id = "jobResults.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Job result ID")),
    responses(
        (status = 200, description = "Result found", body = JobResult),
        (status = 404, description = "Result not found", body = ApiError),
    )
)]
pub async fn get_job_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<JobResult>> {
    let result = state
        .db
        .get_job_result(id, user.id)
        .await?
        .ok_or_else(|| not_found("Job result", id))?;
    Ok(ApiResponse::success(result))
}
