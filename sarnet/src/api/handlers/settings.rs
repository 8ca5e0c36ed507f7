use axum::extract::State;
use chrono::Utc;

use crate::api::dto::SettingsRequest;
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::UserSettings;

use super::{not_found, validated};

/// `GET /api/user-settings/`
#[utoipa::path(
    get,
    path = "/api/user-settings/",
    tag = "settings",
    operation_id = "settings.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's settings", body = Paginated<UserSettings>),
    )
)]
pub async fn list_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<UserSettings>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_settings(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/user-settings/`
///
/// A user has at most one settings record; a second create is a 400.
#[utoipa::path(
    post,
    path = "/api/user-settings/",
    tag = "settings",
    operation_id = "settings.create",
    security(("bearer_auth" = [])),
    request_body = SettingsRequest,
    responses(
        (status = 201, description = "Settings created", body = UserSettings),
        (status = 400, description = "Invalid request or settings already exist", body = ApiError),
    )
)]
pub async fn create_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<SettingsRequest>,
) -> Result<ApiResponse<UserSettings>> {
    let req = validated(req)?;
    let mut settings = UserSettings::defaults_for(user.id);
    req.apply(&mut settings);
    let settings = state.db.create_settings(&settings).await?;
    Ok(ApiResponse::created(settings))
}

/// `GET /api/user-settings/my_settings/`
///
/// Returns the caller's settings, creating them with defaults on first access.
#[utoipa::path(
    get,
    path = "/api/user-settings/my_settings/",
    tag = "settings",
    operation_id = "settings.mine",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's settings", body = UserSettings),
    )
)]
pub async fn my_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<UserSettings>> {
    Ok(ApiResponse::success(
        state.db.get_or_create_settings(user.id).await?,
    ))
}

/// `GET /api/user-settings/{id}/`
#[utoipa::path(
    get,
    path = "/api/user-settings/{id}/",
    tag = "settings",
    operation_id = "settings.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Settings ID")),
    responses(
        (status = 200, description = "Settings found", body = UserSettings),
        (status = 404, description = "Settings not found", body = ApiError),
    )
)]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<UserSettings>> {
    let settings = state
        .db
        .get_settings(id, user.id)
        .await?
        .ok_or_else(|| not_found("Settings", id))?;
    Ok(ApiResponse::success(settings))
}

/// `PATCH /api/user-settings/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/user-settings/{id}/",
    tag = "settings",
    operation_id = "settings.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Settings ID")),
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = UserSettings),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Settings not found", body = ApiError),
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<SettingsRequest>,
) -> Result<ApiResponse<UserSettings>> {
    let req = validated(req)?;
    let mut settings = state
        .db
        .get_settings(id, user.id)
        .await?
        .ok_or_else(|| not_found("Settings", id))?;
    req.apply(&mut settings);
    settings.updated_at = Utc::now();
    state.db.update_settings(&settings).await?;
    Ok(ApiResponse::success(settings))
}

/// `DELETE /api/user-settings/{id}/`
#[utoipa::path(
    delete,
    path = "/api/user-settings/{id}/",
    tag = "settings",
    operation_id = "settings.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Settings ID")),
    responses(
        (status = 204, description = "Settings deleted"),
        (status = 404, description = "Settings not found", body = ApiError),
    )
)]
pub async fn delete_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_settings(id, user.id).await? {
        return Err(not_found("Settings", id));
    }
    Ok(ApiResponse::no_content())
}
