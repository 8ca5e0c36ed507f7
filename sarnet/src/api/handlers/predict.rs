use axum::extract::State;

use crate::api::dto::{PredictForm, PredictResponse};
use crate::api::extractors::{AppMultipart, AuthUser};
use crate::api::response::{ApiError, ApiResponse};
use crate::api::state::AppState;
use crate::error::{Result, SarnetError};

use super::FormData;

/// `POST /api/predict/`
///
/// Colorizes one SAR image with the GAN generator and returns the result as
/// a base64 PNG.
#[utoipa::path(
    post,
    path = "/api/predict/",
    tag = "predict",
    operation_id = "predict.colorize",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", content = PredictForm),
    responses(
        (status = 200, description = "Colorized image", body = PredictResponse),
        (status = 400, description = "No image provided", body = ApiError),
        (status = 500, description = "Image could not be decoded or colorized", body = ApiError),
        (status = 503, description = "Colorization model unavailable", body = ApiError),
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppMultipart(multipart): AppMultipart,
) -> Result<ApiResponse<PredictResponse>> {
    let mut form = FormData::read(multipart).await?;
    let file = form
        .take_file("image")
        .map_err(|_| SarnetError::Validation("No image provided".to_string()))?;
    if file.bytes.is_empty() {
        return Err(SarnetError::Validation("No image provided".to_string()));
    }

    let started = std::time::Instant::now();
    let colorized_image = state.colorizer.colorize(file.bytes.to_vec()).await?;
    tracing::info!(
        user_id = user.id,
        input_bytes = file.bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Image colorized"
    );

    Ok(ApiResponse::success(PredictResponse { colorized_image }))
}
