//! Session images. Files are uploaded as multipart and stored under the
//! media root; metadata edits go through JSON.

use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{ImageUploadForm, UpdateImageRequest};
use crate::api::extractors::{AppJson, AppMultipart, AppPath, AppQuery, AuthUser};
use crate::api::response::{ApiError, ApiResponse, PageQuery, Paginated};
use crate::api::state::AppState;
use crate::error::{Result, SarnetError};
use crate::models::Image;

use super::sessions::remove_image_files;
use super::{not_found, validated, FormData};

const MAX_ID_LEN: usize = 255;

/// `GET /api/images/`
#[utoipa::path(
    get,
    path = "/api/images/",
    tag = "images",
    operation_id = "images.list",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Images in the caller's sessions", body = Paginated<Image>),
    )
)]
pub async fn list_images(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<ApiResponse<Paginated<Image>>> {
    let page = query.resolve(&state.config.pagination);
    let (images, total) = state.db.list_images(user.id, page).await?;
    Ok(ApiResponse::success(Paginated::new(images, total, page)))
}

/// `POST /api/images/`
#[utoipa::path(
    post,
    path = "/api/images/",
    tag = "images",
    operation_id = "images.create",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", content = ImageUploadForm),
    responses(
        (status = 201, description = "Image stored", body = Image),
        (status = 400, description = "Missing fields, unknown session or invalid image", body = ApiError),
    )
)]
pub async fn create_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppMultipart(multipart): AppMultipart,
) -> Result<ApiResponse<Image>> {
    let mut form = FormData::read(multipart).await?;

    let session_id: i64 = form
        .required_text("session")?
        .parse()
        .map_err(|_| SarnetError::Validation("session must be an integer id".to_string()))?;
    if state.db.get_session(session_id, user.id).await?.is_none() {
        return Err(SarnetError::Validation(format!(
            "Session {session_id} does not exist"
        )));
    }

    let image_id = form
        .text("image_id")
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let external_user = form
        .text("user_id")
        .map(str::to_string)
        .unwrap_or_else(|| user.id.to_string());
    if image_id.len() > MAX_ID_LEN || external_user.len() > MAX_ID_LEN {
        return Err(SarnetError::Validation(format!(
            "image_id and user_id must be at most {MAX_ID_LEN} characters"
        )));
    }

    let file = form.take_file("image")?;
    state.media.check_image(&file.bytes)?;
    let storage_path = state
        .media
        .save_image(user.id, &image_id, &file.file_name, &file.bytes)
        .await?;

    let now = Utc::now();
    let image = Image {
        id: 0,
        session_id,
        user_id: external_user,
        image_id,
        storage_path,
        created_at: now,
        updated_at: now,
    };

    match state.db.create_image(&image).await {
        Ok(image) => {
            tracing::debug!(id = image.id, session_id, path = %image.storage_path, "Image stored");
            Ok(ApiResponse::created(image))
        }
        Err(e) => {
            remove_image_files(&state, std::slice::from_ref(&image)).await;
            Err(e)
        }
    }
}

/// `GET /api/images/{id}/`
#[utoipa::path(
    get,
    path = "/api/images/{id}/",
    tag = "images",
    operation_id = "images.get",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image found", body = Image),
        (status = 404, description = "Image not found", body = ApiError),
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<Image>> {
    let image = state
        .db
        .get_image(id, user.id)
        .await?
        .ok_or_else(|| not_found("Image", id))?;
    Ok(ApiResponse::success(image))
}

/// `PATCH /api/images/{id}/` (also `PUT`)
#[utoipa::path(
    patch,
    path = "/api/images/{id}/",
    tag = "images",
    operation_id = "images.update",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Image ID")),
    request_body = UpdateImageRequest,
    responses(
        (status = 200, description = "Image updated", body = Image),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Image not found", body = ApiError),
    )
)]
pub async fn update_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateImageRequest>,
) -> Result<ApiResponse<Image>> {
    let req = validated(req)?;
    let mut image = state
        .db
        .get_image(id, user.id)
        .await?
        .ok_or_else(|| not_found("Image", id))?;

    let previous_session = image.session_id;
    if let Some(target) = req.session.filter(|&s| s != previous_session) {
        if state.db.get_session(target, user.id).await?.is_none() {
            return Err(SarnetError::Validation(format!(
                "Session {target} does not exist"
            )));
        }
    }

    req.apply(&mut image);
    image.updated_at = Utc::now();
    state.db.update_image(&image, previous_session).await?;
    Ok(ApiResponse::success(image))
}

/// `DELETE /api/images/{id}/`
#[utoipa::path(
    delete,
    path = "/api/images/{id}/",
    tag = "images",
    operation_id = "images.delete",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 404, description = "Image not found", body = ApiError),
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<ApiResponse<()>> {
    let image = state
        .db
        .get_image(id, user.id)
        .await?
        .ok_or_else(|| not_found("Image", id))?;
    if !state.db.delete_image(&image).await? {
        return Err(not_found("Image", id));
    }
    remove_image_files(&state, std::slice::from_ref(&image)).await;
    Ok(ApiResponse::no_content())
}
