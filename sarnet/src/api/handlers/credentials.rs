use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{CreateCredentialsRequest, UpdateCredentialsRequest};
use crate::api::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{UserCredentials, DEFAULT_HASH_ALGORITHM};

use super::{not_found, validated};

/// `GET /api/user-credentials/`
#[utoipa::path(
    get,
    path = "/api/user-credentials/",
    tag = "credentials",
    operation_id = "credentials.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's stored credentials", body = Paginated<UserCredentials>),
    )
)]
pub async fn list_credentials(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<UserCredentials>>> {
    let page = query.resolve(&state.config.pagination);
    let (items, total) = state.db.list_credentials(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(items, total, page)))
}

/// `POST /api/user-credentials/`
#[utoipa::path(
    post,
    path = "/api/user-credentials/",
    tag = "credentials",
    operation_id = "credentials.create",
    security(("bearer_auth" = [])),
    request_body = CreateCredentialsRequest,
    responses(
        (status = 201, description = "Credentials stored", body = UserCredentials),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_credentials(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<CreateCredentialsRequest>,
) -> Result<ApiResponse<UserCredentials>> {
    let req = validated(req)?;
    let now = Utc::now();
    let creds = UserCredentials {
        id: 0,
        user_id: user.id,
        username: req.username,
        password_hash: req.password_hash,
        salt: req.salt,
        hash_algorithm: req
            .hash_algorithm
            .unwrap_or_else(|| DEFAULT_HASH_ALGORITHM.to_string()),
        created_at: now,
        updated_at: now,
    };
    let creds = state.db.create_credentials(&creds).await?;
    Ok(ApiResponse::created(creds))
}

/// `GET /api/user-credentials/{id}/`
#[utoipa::path(
    get,
    path = "/api/user-credentials/{id}/",
    tag = "credentials",
    operation_id = "credentials.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Credentials ID")),
    responses(
        (status = 200, description = "Credentials found", body = UserCredentials),
        (status = 404, description = "Credentials not found", body = ApiError),
    )
)]
pub async fn get_credentials(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<UserCredentials>> {
    let creds = state
        .db
        .get_credentials(id, user.id)
        .await?
        .ok_or_else(|| not_found("Credentials", id))?;
    Ok(ApiResponse::success(creds))
}

/// `PATCH /api/user-credentials/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/user-credentials/{id}/",
    tag = "credentials",
    operation_id = "credentials.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Credentials ID")),
    request_body = UpdateCredentialsRequest,
    responses(
        (status = 200, description = "Credentials updated", body = UserCredentials),
        (status = 404, description = "Credentials not found", body = ApiError),
    )
)]
pub async fn update_credentials(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateCredentialsRequest>,
) -> Result<ApiResponse<UserCredentials>> {
    let req = validated(req)?;
    let mut creds = state
        .db
        .get_credentials(id, user.id)
        .await?
        .ok_or_else(|| not_found("Credentials", id))?;
    req.apply(&mut creds);
    creds.updated_at = Utc::now();
    state.db.update_credentials(&creds).await?;
    Ok(ApiResponse::success(creds))
}

/// `DELETE /api/user-credentials/{id}/`
#[utoipa::path(
    delete,
    path = "/api/user-credentials/{id}/",
    tag = "credentials",
    operation_id = "credentials.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Credentials ID")),
    responses(
        (status = 204, description = "Credentials deleted"),
        (status = 404, description = "Credentials not found", body = ApiError),
    )
)]
pub async fn delete_credentials(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    if !state.db.delete_credentials(id, user.id).await? {
        return Err(not_found("Credentials", id));
    }
    Ok(ApiResponse::no_content())
}
