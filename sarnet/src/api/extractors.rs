use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Multipart};
use axum::http::request::Parts;
use axum_extra::extract::QueryRejection;

use crate::auth::TokenType;
use crate::error::SarnetError;
use crate::models::User;

use super::AppState;

/// JSON body whose rejections render as `SarnetError` bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(SarnetError))]
pub struct AppJson<T>(pub T);

/// Query string extractor with the same error body as everything else.
#[derive(FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(SarnetError))]
pub struct AppQuery<T>(pub T);

/// Path parameters with JSON rejections.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(SarnetError))]
pub struct AppPath<T>(pub T);

impl From<JsonRejection> for SarnetError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

impl From<QueryRejection> for SarnetError {
    fn from(rejection: QueryRejection) -> Self {
        SarnetError::Validation(format!("Invalid query parameters: {rejection}"))
    }
}

impl From<PathRejection> for SarnetError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(_) => {
                SarnetError::NotFound("Not found".to_string())
            }
            other => SarnetError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartRejection> for SarnetError {
    fn from(rejection: MultipartRejection) -> Self {
        SarnetError::Validation(format!("Expected a multipart form: {rejection}"))
    }
}

impl From<MultipartError> for SarnetError {
    fn from(err: MultipartError) -> Self {
        SarnetError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

fn map_json_rejection(rejection: JsonRejection) -> SarnetError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                SarnetError::Validation(format!("Missing required field: {field}"))
            } else {
                SarnetError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            SarnetError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => {
            SarnetError::Validation("Missing `Content-Type: application/json` header".to_string())
        }
        JsonRejection::BytesRejection(_) => {
            SarnetError::Validation("Failed to read request body".to_string())
        }
        _ => SarnetError::Validation(rejection.to_string()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

/// Multipart form extractor that rejects with `SarnetError`.
pub struct AppMultipart(pub Multipart);

impl FromRequest<AppState> for AppMultipart {
    type Rejection = SarnetError;

    async fn from_request(
        req: axum::extract::Request,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Ok(Self(multipart))
    }
}

/// The caller, resolved from `Authorization: Bearer <access token>`.
///
/// Missing or malformed headers, bad or expired tokens, refresh tokens, and
/// tokens for deleted or inactive users all reject with 401.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = SarnetError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(h) if h.starts_with("Bearer ") => &h[7..],
            Some(_) => {
                return Err(SarnetError::Unauthorized(
                    "Invalid authorization header format. Expected: Bearer <token>".to_string(),
                ))
            }
            None => {
                return Err(SarnetError::Unauthorized(
                    "Authentication credentials were not provided".to_string(),
                ))
            }
        };

        let claims = state.tokens.verify(token.trim(), Some(TokenType::Access))?;
        match state.db.get_user(claims.user_id).await? {
            Some(user) if user.is_active => Ok(Self(user)),
            Some(_) => Err(SarnetError::Unauthorized("User is inactive".to_string())),
            None => Err(SarnetError::Unauthorized("User not found".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        assert_eq!(
            extract_missing_field("Failed to deserialize: missing field `session_id` at line 1"),
            Some("session_id")
        );
        assert_eq!(extract_missing_field("expected a string"), None);
    }
}
