use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{CreateNotificationRequest, UpdateNotificationRequest};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated, StatusMessage};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::Notification;

use super::{not_found, validated};

/// `GET /api/notifications/`
#[utoipa::path(
    get,
    path = "/api/notifications/",
    tag = "notifications",
    operation_id = "notifications.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = Paginated<Notification>),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<Notification>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_notifications(user.id, false, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `GET /api/notifications/unread/`
#[utoipa::path(
    get,
    path = "/api/notifications/unread/",
    tag = "notifications",
    operation_id = "notifications.unread",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Unread notifications", body = Paginated<Notification>),
    )
)]
pub async fn unread_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<Notification>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_notifications(user.id, true, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/notifications/`
#[utoipa::path(
    post,
    path = "/api/notifications/",
    tag = "notifications",
    operation_id = "notifications.create",
    security(("bearer_auth" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateNotificationRequest>,
) -> Result<ApiResponse<Notification>> {
    let req = validated(req)?;
    let notification = state
        .db
        .create_notification(&req.into_notification(user.id))
        .await?;
    Ok(ApiResponse::created(notification))
}

/// `GET /api/notifications/{id}/`
#[utoipa::path(
    get,
    path = "/api/notifications/{id}/",
    tag = "notifications",
    operation_id = "notifications.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification found", body = Notification),
        (status = 404, description = "Notification not found", body = ApiError),
    )
)]
pub async fn get_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<Notification>> {
    let notification = state
        .db
        .get_notification(id, user.id)
        .await?
        .ok_or_else(|| not_found("Notification", id))?;
    Ok(ApiResponse::success(notification))
}

/// `PATCH /api/notifications/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/",
    tag = "notifications",
    operation_id = "notifications.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification ID")),
    request_body = UpdateNotificationRequest,
    responses(
        (status = 200, description = "Notification updated", body = Notification),
        (status = 404, description = "Notification not found", body = ApiError),
    )
)]
pub async fn update_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateNotificationRequest>,
) -> Result<ApiResponse<Notification>> {
    let req = validated(req)?;
    let mut notification = state
        .db
        .get_notification(id, user.id)
        .await?
        .ok_or_else(|| not_found("Notification", id))?;
    req.apply(&mut notification);
    notification.updated_at = Utc::now();
    state.db.update_notification(&notification).await?;
    Ok(ApiResponse::success(notification))
}

/// `DELETE /api/notifications/{id}/`
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}/",
    tag = "notifications",
    operation_id = "notifications.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = ApiError),
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_notification(id, user.id).await? {
        return Err(not_found("Notification", id));
    }
    Ok(ApiResponse::no_content())
}

/// `POST /api/notifications/{id}/mark_read/`
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/mark_read/",
    tag = "notifications",
    operation_id = "notifications.markRead",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read", body = StatusMessage),
        (status = 404, description = "Notification not found", body = ApiError),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<StatusMessage>> {
    if !state.db.set_notification_read(id, user.id, true).await? {
        return Err(not_found("Notification", id));
    }
    Ok(ApiResponse::success(StatusMessage::new(
        "Notification marked as read",
    )))
}

/// `POST /api/notifications/{id}/mark_unread/`
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/mark_unread/",
    tag = "notifications",
    operation_id = "notifications.markUnread",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as unread", body = StatusMessage),
        (status = 404, description = "Notification not found", body = ApiError),
    )
)]
pub async fn mark_unread(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<StatusMessage>> {
    if !state.db.set_notification_read(id, user.id, false).await? {
        return Err(not_found("Notification", id));
    }
    Ok(ApiResponse::success(StatusMessage::new(
        "Notification marked as unread",
    )))
}

/// `POST /api/notifications/mark_all_read/`
#[utoipa::path(
    post,
    path = "/api/notifications/mark_all_read/",
    tag = "notifications",
    operation_id = "notifications.markAllRead",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All notifications marked as read", body = StatusMessage),
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<StatusMessage>> {
    let updated = state.db.mark_all_notifications_read(user.id).await?;
    tracing::debug!(user_id = user.id, updated, "Marked all notifications read");
    Ok(ApiResponse::success(StatusMessage::new(
        "All notifications marked as read",
    )))
}
