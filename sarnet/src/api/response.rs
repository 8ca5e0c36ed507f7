//! # Response Shapes & Error Contract
//!
//! Successful responses carry the resource itself as the JSON body. List
//! endpoints wrap their items in a [`Paginated`] page:
//!
//! ```json
//! { "count": 42, "next": 3, "previous": 1, "results": [ ... ] }
//! ```
//!
//! Errors always use the same body, produced by
//! [`SarnetError`](crate::error::SarnetError)'s `IntoResponse`:
//!
//! ```json
//! { "error": "Notification not found", "code": "not_found" }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::models::Page;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, bad parameters, or failed validation. HTTP 400.
    InvalidRequest,
    /// Missing or invalid token, or bad credentials. HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// The record does not exist or belongs to someone else. HTTP 404.
    NotFound,
    /// HTTP 409.
    Conflict,
    /// Unexpected server-side failure. HTTP 500.
    InternalError,
    /// The colorization model is not loaded. HTTP 503.
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Classify an HTTP status. Anything unrecognized is an internal error
    /// for 5xx and an invalid request otherwise.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidRequest,
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::CONFLICT => Self::Conflict,
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable,
            s if s.is_server_error() => Self::InternalError,
            _ => Self::InvalidRequest,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

/// Error body. Documented for OpenAPI; built by `SarnetError::into_response`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Human-readable description. Internal details are never included.
    pub error: String,
    pub code: ErrorCode,
    /// Per-field validation messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<std::collections::BTreeMap<String, Vec<String>>>,
}

/// Simple acknowledgement returned by custom actions.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatusMessage {
    pub status: String,
}

impl StatusMessage {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Page-number pagination accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number. Defaults to 1.
    pub page: Option<u32>,
    /// Items per page. Defaults to `PAGE_SIZE`, clamped to `1..=100`.
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn resolve(&self, config: &PaginationConfig) -> Page {
        let size = self
            .page_size
            .unwrap_or(config.page_size)
            .clamp(1, config.max_page_size.max(1));
        Page::new(self.page.unwrap_or(1), size)
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Paginated<T> {
    /// Total number of matching records across all pages.
    pub count: u64,
    /// Next page number, if any.
    pub next: Option<u32>,
    /// Previous page number, if any.
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, count: u64, page: Page) -> Self {
        Self {
            count,
            next: page.has_next(count).then_some(page.number + 1),
            previous: (page.number > 1).then_some(page.number - 1),
            results,
        }
    }
}

/// A success body plus its status code.
///
/// Handlers return `Result<ApiResponse<T>>`; errors go through
/// `SarnetError`'s own `IntoResponse`.
#[derive(Debug, Clone)]
pub struct ApiResponse<T: Serialize> {
    body: Option<T>,
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// HTTP 200.
    pub fn success(data: T) -> Self {
        Self {
            body: Some(data),
            status: StatusCode::OK,
        }
    }

    /// HTTP 201.
    pub fn created(data: T) -> Self {
        Self {
            body: Some(data),
            status: StatusCode::CREATED,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ApiResponse<()> {
    /// HTTP 204 with an empty body.
    pub fn no_content() -> Self {
        Self {
            body: None,
            status: StatusCode::NO_CONTENT,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        let Some(body) = self.body else {
            return status.into_response();
        };

        match serde_json::to_value(&body) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                let body = serde_json::json!({
                    "error": "An internal error occurred",
                    "code": ErrorCode::InternalError,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination() -> PaginationConfig {
        PaginationConfig {
            page_size: 20,
            max_page_size: 100,
        }
    }

    #[test]
    fn error_code_status_mapping() {
        for code in [
            ErrorCode::InvalidRequest,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::NotFound,
            ErrorCode::Conflict,
            ErrorCode::InternalError,
            ErrorCode::ServiceUnavailable,
        ] {
            assert_eq!(ErrorCode::from_status(code.status()), code);
        }
        assert_eq!(
            ErrorCode::from_status(StatusCode::BAD_GATEWAY),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn error_code_serializes_snake_case() {
        let json = serde_json::to_value(ErrorCode::ServiceUnavailable).expect("serialize");
        assert_eq!(json, "service_unavailable");
        assert_eq!(ErrorCode::InvalidRequest.to_string(), "invalid_request");
    }

    #[test]
    fn page_query_defaults_and_clamps() {
        let page = PageQuery::default().resolve(&pagination());
        assert_eq!(page, Page::new(1, 20));

        let page = PageQuery {
            page: Some(0),
            page_size: Some(1000),
        }
        .resolve(&pagination());
        assert_eq!(page, Page::new(1, 100));
    }

    #[test]
    fn paginated_links() {
        let page = Paginated::new(vec![1, 2], 5, Page::new(2, 2));
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Paginated::new(vec![5], 5, Page::new(3, 2));
        assert_eq!(last.next, None);

        let json = serde_json::to_value(Paginated::new(Vec::<u8>::new(), 0, Page::default()))
            .expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"count": 0, "next": null, "previous": null, "results": []})
        );
    }

    #[test]
    fn no_content_has_empty_body() {
        let resp = ApiResponse::no_content().into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
