use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{
    ClearHistoryResponse, CreateSessionRequest, SessionResponse, UpdateSessionRequest,
};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated, StatusMessage};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{Image, Page, Session};

use super::{not_found, validated};

async fn with_images(state: &AppState, session: Session) -> Result<SessionResponse> {
    let images = state.db.list_session_images(session.id).await?;
    Ok(SessionResponse { session, images })
}

/// Every image in the user's sessions, across all pages.
pub(crate) async fn owned_images(state: &AppState, user_id: i64) -> Result<Vec<Image>> {
    let mut images = Vec::new();
    let mut page = Page::new(1, 100);
    loop {
        let (batch, total) = state.db.list_images(user_id, page).await?;
        images.extend(batch);
        if !page.has_next(total) {
            return Ok(images);
        }
        page = Page::new(page.number + 1, page.size);
    }
}

/// Remove stored files after their rows are gone. Failures only warn.
pub(crate) async fn remove_image_files(state: &AppState, images: &[Image]) {
    for image in images {
        if image.storage_path.is_empty() {
            continue;
        }
        if let Err(e) = state.media.delete(&image.storage_path).await {
            tracing::warn!(error = %e, image_id = image.id, "Failed to remove image file");
        }
    }
}

/// `GET /api/sessions/`
#[utoipa::path(
    get,
    path = "/api/sessions/",
    tag = "sessions",
    operation_id = "sessions.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's sessions, newest first", body = Paginated<SessionResponse>),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<SessionResponse>>> {
    let page = query.resolve(&state.config.pagination);
    let (sessions, total) = state.db.list_sessions(user.id, page).await?;

    let mut results = Vec::with_capacity(sessions.len());
    for session in sessions {
        results.push(with_images(&state, session).await?);
    }
    Ok(ApiResponse::success(Paginated::new(results, total, page)))
}

/// `POST /api/sessions/`
#[utoipa::path(
    post,
    path = "/api/sessions/",
    tag = "sessions",
    operation_id = "sessions.create",
    security(("bearer_auth" = [])),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid request or duplicate session_id", body = ApiError),
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<ApiResponse<SessionResponse>> {
    let req = validated(req)?;
    let session = state
        .db
        .create_session(&req.into_session(user.id, &user.username))
        .await?;
    tracing::debug!(id = session.id, session_id = %session.session_id, "Session created");
    Ok(ApiResponse::created(SessionResponse {
        session,
        images: Vec::new(),
    }))
}

/// `GET /api/sessions/{id}/`
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/",
    tag = "sessions",
    operation_id = "sessions.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session with its images", body = SessionResponse),
        (status = 404, description = "Session not found", body = ApiError),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<SessionResponse>> {
    let session = state
        .db
        .get_session(id, user.id)
        .await?
        .ok_or_else(|| not_found("Session", id))?;
    Ok(ApiResponse::success(with_images(&state, session).await?))
}

/// `PATCH /api/sessions/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/sessions/{id}/",
    tag = "sessions",
    operation_id = "sessions.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Session ID")),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = SessionResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Session not found", body = ApiError),
    )
)]
pub async fn update_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateSessionRequest>,
) -> Result<ApiResponse<SessionResponse>> {
    let req = validated(req)?;
    let mut session = state
        .db
        .get_session(id, user.id)
        .await?
        .ok_or_else(|| not_found("Session", id))?;
    req.apply(&mut session);
    session.updated_at = Utc::now();
    state.db.update_session(&session).await?;
    Ok(ApiResponse::success(with_images(&state, session).await?))
}

/// `DELETE /api/sessions/{id}/`
///
/// Removes the session's images and linked events with it.
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}/",
    tag = "sessions",
    operation_id = "sessions.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ApiError),
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    let session = state
        .db
        .get_session(id, user.id)
        .await?
        .ok_or_else(|| not_found("Session", id))?;
    let images = state.db.list_session_images(session.id).await?;

    if !state.db.delete_session(id, user.id).await? {
        return Err(not_found("Session", id));
    }
    remove_image_files(&state, &images).await;
    Ok(ApiResponse::no_content())
}

/// `POST /api/sessions/{id}/mark_analyzed/`
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/mark_analyzed/",
    tag = "sessions",
    operation_id = "sessions.markAnalyzed",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Session ID")),
    responses(
        (status = 200, description = "post_analysis_at set to now", body = StatusMessage),
        (status = 404, description = "Session not found", body = ApiError),
    )
)]
pub async fn mark_analyzed(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<StatusMessage>> {
    if !state.db.mark_session_analyzed(id, user.id, Utc::now()).await? {
        return Err(not_found("Session", id));
    }
    Ok(ApiResponse::success(StatusMessage::new(
        "Session marked as analyzed",
    )))
}

/// `POST /api/sessions/clear_history/`
///
/// Deletes every session the caller owns, cascading to images and events.
#[utoipa::path(
    post,
    path = "/api/sessions/clear_history/",
    tag = "sessions",
    operation_id = "sessions.clearHistory",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "History cleared", body = ClearHistoryResponse),
    )
)]
pub async fn clear_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<ClearHistoryResponse>> {
    let images = owned_images(&state, user.id).await?;
    let deleted = state.db.clear_sessions(user.id).await?;
    remove_image_files(&state, &images).await;
    tracing::info!(user_id = user.id, deleted, "Session history cleared");

    Ok(ApiResponse::success(ClearHistoryResponse {
        status: "History cleared".to_string(),
        deleted,
    }))
}
