//! User accounts. Regular users only ever see themselves; superusers see everyone.

use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{CreateUserRequest, UpdateUserRequest};
use crate::api::extractors::{AppJson, AppMultipart, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::auth::{hash_password_async, unique_username, username_base_from_email};
use crate::error::{Result, SarnetError};
use crate::models::User;

use super::auth::{ensure_email_free, ensure_username_free};
use super::sessions::{owned_images, remove_image_files};
use super::{not_found, validated, FormData};

/// Fetch a user the caller may see.
async fn visible_user(state: &AppState, caller: &User, id: i64) -> Result<User> {
    if caller.id == id {
        return Ok(caller.clone());
    }
    if !caller.is_superuser {
        return Err(not_found("User", id));
    }
    state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| not_found("User", id))
}

async fn apply_update(state: &AppState, mut user: User, req: UpdateUserRequest) -> Result<User> {
    let req = validated(req)?;
    if let Some(email) = req.email.as_deref().map(str::trim) {
        if let Some(other) = state.db.get_user_by_email(email).await? {
            if other.id != user.id {
                return Err(SarnetError::Validation(
                    "A user is already registered with this e-mail address".to_string(),
                ));
            }
        }
    }
    req.apply(&mut user);
    if let Some(password) = req.password {
        user.password_hash = hash_password_async(password).await?;
    }
    user.updated_at = Utc::now();
    state.db.update_user(&user).await?;
    Ok(user)
}

/// `GET /api/users/`
#[utoipa::path(
    get,
    path = "/api/users/",
    tag = "users",
    operation_id = "users.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Users visible to the caller", body = Paginated<User>),
        (status = 401, description = "Not authenticated", body = ApiError),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<User>>> {
    let page = query.resolve(&state.config.pagination);
    let scope = (!caller.is_superuser).then_some(caller.id);
    let (users, total) = state.db.list_users(scope, page).await?;
    Ok(ApiResponse::success(Paginated::new(users, total, page)))
}

/// `POST /api/users/`
///
/// Public sign-up. A missing username is derived from the email.
#[utoipa::path(
    post,
    path = "/api/users/",
    tag = "users",
    operation_id = "users.create",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<ApiResponse<User>> {
    let req = validated(req)?;
    let email = req.email.trim().to_string();
    ensure_email_free(&state, &email).await?;

    let username = match req.username {
        Some(name) => {
            ensure_username_free(&state, &name).await?;
            name
        }
        None => unique_username(state.db.as_ref(), &username_base_from_email(&email)).await?,
    };

    let hash = hash_password_async(req.password).await?;
    let mut user = User::new(email, username, hash);
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    user.date_of_birth = req.date_of_birth;

    let user = state.db.create_user(&user).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok(ApiResponse::created(user))
}

/// `GET /api/users/{id}/`
#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    tag = "users",
    operation_id = "users.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ApiError),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<User>> {
    Ok(ApiResponse::success(visible_user(&state, &caller, id).await?))
}

/// `PATCH /api/users/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/users/{id}/",
    tag = "users",
    operation_id = "users.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<ApiResponse<User>> {
    let user = visible_user(&state, &caller, id).await?;
    Ok(ApiResponse::success(apply_update(&state, user, req).await?))
}

/// `DELETE /api/users/{id}/`
#[utoipa::path(
    delete,
    path = "/api/users/{id}/",
    tag = "users",
    operation_id = "users.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ApiError),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    let user = visible_user(&state, &caller, id).await?;
    let images = owned_images(&state, user.id).await?;
    if !state.db.delete_user(user.id).await? {
        return Err(not_found("User", id));
    }
    remove_image_files(&state, &images).await;
    if let Some(avatar) = &user.avatar {
        if let Err(e) = state.media.delete(avatar).await {
            tracing::warn!(error = %e, user_id = id, "Failed to remove avatar file");
        }
    }
    tracing::info!(user_id = id, deleted_by = caller.id, "User deleted");
    Ok(ApiResponse::no_content())
}

/// `GET /api/users/me/`
#[utoipa::path(
    get,
    path = "/api/users/me/",
    tag = "users",
    operation_id = "users.me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ApiError),
    )
)]
pub async fn me(AuthUser(user): AuthUser) -> Result<ApiResponse<User>> {
    Ok(ApiResponse::success(user))
}

/// `PATCH /api/users/me/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/users/me/",
    tag = "users",
    operation_id = "users.updateMe",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Current user updated", body = User),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<ApiResponse<User>> {
    Ok(ApiResponse::success(apply_update(&state, user, req).await?))
}

/// `PATCH /api/users/update_profile/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/users/update_profile/",
    tag = "users",
    operation_id = "users.updateProfile",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<ApiResponse<User>> {
    Ok(ApiResponse::success(apply_update(&state, user, req).await?))
}

/// `POST /api/users/avatar/`
///
/// Multipart form with an `avatar` image file. Replaces any previous avatar.
#[utoipa::path(
    post,
    path = "/api/users/avatar/",
    tag = "users",
    operation_id = "users.avatar",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", content = String, description = "`avatar` image file"),
    responses(
        (status = 200, description = "Avatar stored", body = User),
        (status = 400, description = "Missing or invalid image", body = ApiError),
    )
)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    AppMultipart(multipart): AppMultipart,
) -> Result<ApiResponse<User>> {
    let mut form = FormData::read(multipart).await?;
    let file = form.take_file("avatar")?;
    state.media.check_image(&file.bytes)?;

    let path = state
        .media
        .save_avatar(user.id, &file.file_name, &file.bytes)
        .await?;

    if let Some(previous) = user.avatar.replace(path.clone()) {
        if previous != path {
            if let Err(e) = state.media.delete(&previous).await {
                tracing::warn!(error = %e, user_id = user.id, "Failed to remove old avatar");
            }
        }
    }

    user.updated_at = Utc::now();
    state.db.update_user(&user).await?;
    tracing::info!(user_id = user.id, path = %path, "Avatar updated");
    Ok(ApiResponse::success(user))
}
