//! Processing outputs and source downloads.

use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{
    CreateDownloadRequest, CreateOutputRequest, FormatQuery, UpdateDownloadRequest,
    UpdateOutputRequest,
};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{ProcessingOutput, SourceDownload};

use super::{not_found, validated};

/// `GET /api/processing-outputs/`
#[utoipa::path(
    get,
    path = "/api/processing-outputs/",
    tag = "outputs",
    operation_id = "outputs.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's outputs", body = Paginated<ProcessingOutput>),
    )
)]
pub async fn list_outputs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<ProcessingOutput>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_outputs(user.id, None, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `GET /api/processing-outputs/by_format/?format=`
#[utoipa::path(
    get,
    path = "/api/processing-outputs/by_format/",
    tag = "outputs",
    operation_id = "outputs.byFormat",
    security(("bearer_auth" = [])),
    params(FormatQuery, PageQuery),
    responses(
        (status = 200, description = "Outputs with the given source format", body = Paginated<ProcessingOutput>),
        (status = 400, description = "Format parameter required", body = ApiError),
    )
)]
pub async fn outputs_by_format(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(format): AppQuery<FormatQuery>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<ProcessingOutput>>> {
    let source_format = format.required()?;
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state
        .db
        .list_outputs(user.id, Some(source_format), page)
        .await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/processing-outputs/`
#[utoipa::path(
    post,
    path = "/api/processing-outputs/",
    tag = "outputs",
    operation_id = "outputs.create",
    security(("bearer_auth" = [])),
    request_body = CreateOutputRequest,
    responses(
        (status = 201, description = "Output stored", body = ProcessingOutput),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_output(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateOutputRequest>,
) -> Result<ApiResponse<ProcessingOutput>> {
    let req = validated(req)?;
    let output = state.db.create_output(&req.into_output(user.id)).await?;
    Ok(ApiResponse::created(output))
}

/// `GET /api/processing-outputs/{id}/`
#[utoipa::path(
    get,
    path = "/api/processing-outputs/{id}/",
    tag = "outputs",
    operation_id = "outputs.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Output ID")),
    responses(
        (status = 200, description = "Output found", body = ProcessingOutput),
        (status = 404, description = "Output not found", body = ApiError),
    )
)]
pub async fn get_output(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<ProcessingOutput>> {
    let output = state
        .db
        .get_output(id, user.id)
        .await?
        .ok_or_else(|| not_found("Output", id))?;
    Ok(ApiResponse::success(output))
}

/// `PATCH /api/processing-outputs/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/processing-outputs/{id}/",
    tag = "outputs",
    operation_id = "outputs.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Output ID")),
    request_body = UpdateOutputRequest,
    responses(
        (status = 200, description = "Output updated", body = ProcessingOutput),
        (status = 404, description = "Output not found", body = ApiError),
    )
)]
pub async fn update_output(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateOutputRequest>,
) -> Result<ApiResponse<ProcessingOutput>> {
    let req = validated(req)?;
    let mut output = state
        .db
        .get_output(id, user.id)
        .await?
        .ok_or_else(|| not_found("Output", id))?;
    req.apply(&mut output);
    output.updated_at = Utc::now();
    state.db.update_output(&output).await?;
    Ok(ApiResponse::success(output))
}

/// `DELETE /api/processing-outputs/{id}/`
#[utoipa::path(
    delete,
    path = "/api/processing-outputs/{id}/",
    tag = "outputs",
    operation_id = "outputs.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Output ID")),
    responses(
        (status = 204, description = "Output deleted"),
        (status = 404, description = "Output not found", body = ApiError),
    )
)]
pub async fn delete_output(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_output(id, user.id).await? {
        return Err(not_found("Output", id));
    }
    Ok(ApiResponse::no_content())
}

// ---------------------------------------------------------------------------
// Source downloads
// ---------------------------------------------------------------------------

/// `GET /api/source-downloads/`
#[utoipa::path(
    get,
    path = "/api/source-downloads/",
    tag = "outputs",
    operation_id = "downloads.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's source downloads", body = Paginated<SourceDownload>),
    )
)]
pub async fn list_downloads(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<SourceDownload>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_downloads(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/source-downloads/`
#[utoipa::path(
    post,
    path = "/api/source-downloads/",
    tag = "outputs",
    operation_id = "downloads.create",
    security(("bearer_auth" = [])),
    request_body = CreateDownloadRequest,
    responses(
        (status = 201, description = "Download recorded", body = SourceDownload),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_download(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateDownloadRequest>,
) -> Result<ApiResponse<SourceDownload>> {
    let req = validated(req)?;
    let download = state
        .db
        .create_download(&req.into_download(user.id))
        .await?;
    Ok(ApiResponse::created(download))
}

/// `GET /api/source-downloads/{id}/`
#[utoipa::path(
    get,
    path = "/api/source-downloads/{id}/",
    tag = "outputs",
    operation_id = "downloads.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Download ID")),
    responses(
        (status = 200, description = "Download found", body = SourceDownload),
        (status = 404, description = "Download not found", body = ApiError),
    )
)]
pub async fn get_download(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<SourceDownload>> {
    let download = state
        .db
        .get_download(id, user.id)
        .await?
        .ok_or_else(|| not_found("Download", id))?;
    Ok(ApiResponse::success(download))
}

/// `PATCH /api/source-downloads/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/source-downloads/{id}/",
    tag = "outputs",
    operation_id = "downloads.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Download ID")),
    request_body = UpdateDownloadRequest,
    responses(
        (status = 200, description = "Download updated", body = SourceDownload),
        (status = 404, description = "Download not found", body = ApiError),
    )
)]
pub async fn update_download(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateDownloadRequest>,
) -> Result<ApiResponse<SourceDownload>> {
    let req = validated(req)?;
    let mut download = state
        .db
        .get_download(id, user.id)
        .await?
        .ok_or_else(|| not_found("Download", id))?;
    req.apply(&mut download);
    download.updated_at = Utc::now();
    state.db.update_download(&download).await?;
    Ok(ApiResponse::success(download))
}

/// `DELETE /api/source-downloads/{id}/`
#[utoipa::path(
    delete,
    path = "/api/source-downloads/{id}/",
    tag = "outputs",
    operation_id = "downloads.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Download ID")),
    responses(
        (status = 204, description = "Download deleted"),
        (status = 404, description = "Download not found", body = ApiError),
    )
)]
pub async fn delete_download(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_download(id, user.id).await? {
        return Err(not_found("Download", id));
    }
    Ok(ApiResponse::no_content())
}
