use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{CreateViaEventRequest, UpdateViaEventRequest};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::ViaEvent;

use super::{not_found, validated};

/// `GET /api/via-events/`
#[utoipa::path(
    get,
    path = "/api/via-events/",
    tag = "via-events",
    operation_id = "viaEvents.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's VIA events", body = Paginated<ViaEvent>),
    )
)]
pub async fn list_via_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<ViaEvent>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_via_events(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/via-events/`
#[utoipa::path(
    post,
    path = "/api/via-events/",
    tag = "via-events",
    operation_id = "viaEvents.create",
    security(("bearer_auth" = [])),
    request_body = CreateViaEventRequest,
    responses(
        (status = 201, description = "VIA event recorded", body = ViaEvent),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_via_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateViaEventRequest>,
) -> Result<ApiResponse<ViaEvent>> {
    let req = validated(req)?;
    let event = state
        .db
        .create_via_event(&req.into_via_event(user.id))
        .await?;
    Ok(ApiResponse::created(event))
}

/// `GET /api/via-events/{id}/`
#[utoipa::path(
    get,
    path = "/api/via-events/{id}/",
    tag = "via-events",
    operation_id = "viaEvents.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "VIA event ID")),
    responses(
        (status = 200, description = "VIA event found", body = ViaEvent),
        (status = 404, description = "VIA event not found", body = ApiError),
    )
)]
pub async fn get_via_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<ViaEvent>> {
    let event = state
        .db
        .get_via_event(id, user.id)
        .await?
        .ok_or_else(|| not_found("VIA event", id))?;
    Ok(ApiResponse::success(event))
}

/// `PATCH /api/via-events/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/via-events/{id}/",
    tag = "via-events",
    operation_id = "viaEvents.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "VIA event ID")),
    request_body = UpdateViaEventRequest,
    responses(
        (status = 200, description = "VIA event updated", body = ViaEvent),
        (status = 404, description = "VIA event not found", body = ApiError),
    )
)]
pub async fn update_via_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateViaEventRequest>,
) -> Result<ApiResponse<ViaEvent>> {
    let req = validated(req)?;
    let mut event = state
        .db
        .get_via_event(id, user.id)
        .await?
        .ok_or_else(|| not_found("VIA event", id))?;
    req.apply(&mut event);
    event.updated_at = Utc::now();
    state.db.update_via_event(&event).await?;
    Ok(ApiResponse::success(event))
}

/// `DELETE /api/via-events/{id}/`
#[utoipa::path(
    delete,
    path = "/api/via-events/{id}/",
    tag = "via-events",
    operation_id = "viaEvents.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "VIA event ID")),
    responses(
        (status = 204, description = "VIA event deleted"),
        (status = 404, description = "VIA event not found", body = ApiError),
    )
)]
pub async fn delete_via_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_via_event(id, user.id).await? {
        return Err(not_found("VIA event", id));
    }
    Ok(ApiResponse::no_content())
}
