use serde::{Deserialize, Serialize};

/// Multipart form for `POST /api/predict/`.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct PredictForm {
    /// SAR image in any common raster format.
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PredictResponse {
    /// Base64-encoded RGB PNG.
    pub colorized_image: String,
}
