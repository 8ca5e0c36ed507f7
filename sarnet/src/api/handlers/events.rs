use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{CreateEventRequest, UpdateEventRequest};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::{Result, SarnetError};
use crate::models::Event;

use super::{not_found, validated};

/// A linked chat session must be one of the caller's.
async fn check_chat_session(state: &AppState, user_id: i64, session: Option<i64>) -> Result<()> {
    let Some(session_id) = session else {
        return Ok(());
    };
    if state.db.get_session(session_id, user_id).await?.is_none() {
        return Err(SarnetError::Validation(format!(
            "Session {session_id} does not exist"
        )));
    }
    Ok(())
}

/// `GET /api/events/`
#[utoipa::path(
    get,
    path = "/api/events/",
    tag = "events",
    operation_id = "events.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's events, latest timestamp first", body = Paginated<Event>),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<Event>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_events(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/events/`
#[utoipa::path(
    post,
    path = "/api/events/",
    tag = "events",
    operation_id = "events.create",
    security(("bearer_auth" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event recorded", body = Event),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateEventRequest>,
) -> Result<ApiResponse<Event>> {
    let req = validated(req)?;
    check_chat_session(&state, user.id, req.chat_session).await?;
    let event = state.db.create_event(&req.into_event(user.id)).await?;
    Ok(ApiResponse::created(event))
}

/// `GET /api/events/{id}/`
#[utoipa::path(
    get,
    path = "/api/events/{id}/",
    tag = "events",
    operation_id = "events.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found", body = ApiError),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<Event>> {
    let event = state
        .db
        .get_event(id, user.id)
        .await?
        .ok_or_else(|| not_found("Event", id))?;
    Ok(ApiResponse::success(event))
}

/// `PATCH /api/events/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/events/{id}/",
    tag = "events",
    operation_id = "events.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateEventRequest>,
) -> Result<ApiResponse<Event>> {
    let req = validated(req)?;
    let mut event = state
        .db
        .get_event(id, user.id)
        .await?
        .ok_or_else(|| not_found("Event", id))?;
    if let Some(session) = req.chat_session {
        check_chat_session(&state, user.id, session).await?;
    }
    req.apply(&mut event);
    event.updated_at = Utc::now();
    state.db.update_event(&event).await?;
    Ok(ApiResponse::success(event))
}

/// `DELETE /api/events/{id}/`
#[utoipa::path(
    delete,
    path = "/api/events/{id}/",
    tag = "events",
    operation_id = "events.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ApiError),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_event(id, user.id).await? {
        return Err(not_found("Event", id));
    }
    Ok(ApiResponse::no_content())
}
