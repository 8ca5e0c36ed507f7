use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{CreatePatternRequest, ThresholdQuery, UpdatePatternRequest};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::Pattern;

use super::{not_found, validated};

/// `GET /api/patterns/`
#[utoipa::path(
    get,
    path = "/api/patterns/",
    tag = "patterns",
    operation_id = "patterns.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's patterns", body = Paginated<Pattern>),
    )
)]
pub async fn list_patterns(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<Pattern>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_patterns(user.id, None, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `GET /api/patterns/high_confidence/`
///
/// Patterns whose confidence is strictly above `threshold` (default 0.8).
#[utoipa::path(
    get,
    path = "/api/patterns/high_confidence/",
    tag = "patterns",
    operation_id = "patterns.highConfidence",
    security(("bearer_auth" = [])),
    params(ThresholdQuery, PageQuery),
    responses(
        (status = 200, description = "Patterns above the threshold", body = Paginated<Pattern>),
        (status = 400, description = "Threshold is not a number in [0, 1]", body = ApiError),
    )
)]
pub async fn high_confidence(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(threshold): AppQuery<ThresholdQuery>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<Pattern>>> {
    let above = threshold.resolve()?;
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_patterns(user.id, Some(above), page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/patterns/`
#[utoipa::path(
    post,
    path = "/api/patterns/",
    tag = "patterns",
    operation_id = "patterns.create",
    security(("bearer_auth" = [])),
    request_body = CreatePatternRequest,
    responses(
        (status = 201, description = "Pattern created", body = Pattern),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_pattern(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreatePatternRequest>,
) -> Result<ApiResponse<Pattern>> {
    let req = validated(req)?;
    let pattern = state.db.create_pattern(&req.into_pattern(user.id)).await?;
    Ok(ApiResponse::created(pattern))
}

/// `GET /api/patterns/{id}/`
#[utoipa::path(
    get,
    path = "/api/patterns/{id}/",
    tag = "patterns",
    operation_id = "patterns.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Pattern ID")),
    responses(
        (status = 200, description = "Pattern found", body = Pattern),
        (status = 404, description = "Pattern not found", body = ApiError),
    )
)]
pub async fn get_pattern(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<Pattern>> {
    let pattern = state
        .db
        .get_pattern(id, user.id)
        .await?
        .ok_or_else(|| not_found("Pattern", id))?;
    Ok(ApiResponse::success(pattern))
}

/// `PATCH /api/patterns/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/patterns/{id}/",
    tag = "patterns",
    operation_id = "patterns.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Pattern ID")),
    request_body = UpdatePatternRequest,
    responses(
        (status = 200, description = "Pattern updated", body = Pattern),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Pattern not found", body = ApiError),
    )
)]
pub async fn update_pattern(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdatePatternRequest>,
) -> Result<ApiResponse<Pattern>> {
    let req = validated(req)?;
    let mut pattern = state
        .db
        .get_pattern(id, user.id)
        .await?
        .ok_or_else(|| not_found("Pattern", id))?;
    req.apply(&mut pattern);
    pattern.updated_at = Utc::now();
    state.db.update_pattern(&pattern).await?;
    Ok(ApiResponse::success(pattern))
}

/// `DELETE /api/patterns/{id}/`
#[utoipa::path(
    delete,
    path = "/api/patterns/{id}/",
    tag = "patterns",
    operation_id = "patterns.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Pattern ID")),
    responses(
        (status = 204, description = "Pattern deleted"),
        (status = 404, description = "Pattern not found", body = ApiError),
    )
)]
pub async fn delete_pattern(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_pattern(id, user.id).await? {
        return Err(not_found("Pattern", id));
    }
    Ok(ApiResponse::no_content())
}
