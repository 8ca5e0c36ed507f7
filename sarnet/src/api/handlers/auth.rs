//! Token and account endpoints.

use axum::extract::State;
use serde_json::{json, Value};

use crate::api::dto::{
    AccessTokenResponse, AuthResponse, RegistrationRequest, TokenObtainRequest,
    TokenRefreshRequest, TokenVerifyRequest,
};
use crate::api::extractors::{AppJson, AuthUser};
use crate::api::response::{ApiError, ApiResponse};
use crate::api::state::AppState;
use crate::auth::{
    hash_password_async, is_valid_username, unique_username, username_base_from_email,
    verify_password_async, TokenPair, TokenType, USERNAME_RULE,
};
use crate::error::{Result, SarnetError};
use crate::models::User;

use super::validated;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Resolve an email-or-username plus password to an active user.
async fn authenticate(state: &AppState, req: TokenObtainRequest) -> Result<User> {
    let identifier = req.email.as_deref().map(str::trim).unwrap_or_default();
    let password = req.password.unwrap_or_default();
    if identifier.is_empty() || password.is_empty() {
        return Err(SarnetError::Validation(
            "Email/username and password are required".to_string(),
        ));
    }

    let user = if identifier.contains('@') {
        state.db.get_user_by_email(identifier).await?
    } else {
        state.db.get_user_by_username(identifier).await?
    };

    let Some(user) = user else {
        tracing::debug!(identifier, "Login for unknown account");
        return Err(SarnetError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password_async(password, user.password_hash.clone()).await? || !user.is_active {
        tracing::debug!(user_id = user.id, "Rejected login");
        return Err(SarnetError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// `POST /api/token/`
#[utoipa::path(
    post,
    path = "/api/token/",
    tag = "auth",
    operation_id = "token.obtain",
    request_body = TokenObtainRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Missing fields", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError),
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<TokenObtainRequest>,
) -> Result<ApiResponse<TokenPair>> {
    let user = authenticate(&state, req).await?;
    Ok(ApiResponse::success(state.tokens.issue_pair(user.id)?))
}

/// `POST /api/token/refresh/`
#[utoipa::path(
    post,
    path = "/api/token/refresh/",
    tag = "auth",
    operation_id = "token.refresh",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ApiError),
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<TokenRefreshRequest>,
) -> Result<ApiResponse<AccessTokenResponse>> {
    let claims = state.tokens.verify(&req.refresh, Some(TokenType::Refresh))?;
    match state.db.get_user(claims.user_id).await? {
        Some(user) if user.is_active => {}
        _ => return Err(SarnetError::Unauthorized("User not found".to_string())),
    }

    let access = state.tokens.issue(claims.user_id, TokenType::Access)?;
    Ok(ApiResponse::success(AccessTokenResponse { access }))
}

/// `POST /api/token/verify/`
#[utoipa::path(
    post,
    path = "/api/token/verify/",
    tag = "auth",
    operation_id = "token.verify",
    request_body = TokenVerifyRequest,
    responses(
        (status = 200, description = "Token is valid", body = Object),
        (status = 401, description = "Token is invalid or expired", body = ApiError),
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<TokenVerifyRequest>,
) -> Result<ApiResponse<Value>> {
    state.tokens.verify(&req.token, None)?;
    Ok(ApiResponse::success(json!({})))
}

/// `POST /api/auth/login/`
#[utoipa::path(
    post,
    path = "/api/auth/login/",
    tag = "auth",
    operation_id = "auth.login",
    request_body = TokenObtainRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<TokenObtainRequest>,
) -> Result<ApiResponse<AuthResponse>> {
    let user = authenticate(&state, req).await?;
    let TokenPair { access, refresh } = state.tokens.issue_pair(user.id)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(ApiResponse::success(AuthResponse {
        access,
        refresh,
        user,
    }))
}

/// `POST /api/auth/registration/`
#[utoipa::path(
    post,
    path = "/api/auth/registration/",
    tag = "auth",
    operation_id = "auth.register",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid registration", body = ApiError),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegistrationRequest>,
) -> Result<ApiResponse<AuthResponse>> {
    let req = validated(req)?;
    if req.password1 != req.password2 {
        return Err(SarnetError::Validation(
            "The two password fields didn't match".to_string(),
        ));
    }

    let email = req.email.trim().to_string();
    ensure_email_free(&state, &email).await?;

    let username = match req.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            ensure_username_free(&state, name).await?;
            name.to_string()
        }
        _ => unique_username(state.db.as_ref(), &username_base_from_email(&email)).await?,
    };

    let hash = hash_password_async(req.password1).await?;
    let mut user = User::new(email, username, hash);
    user.first_name = req.first_name.unwrap_or_default();
    user.last_name = req.last_name.unwrap_or_default();
    user.date_of_birth = req.date_of_birth;

    let user = state.db.create_user(&user).await?;
    let TokenPair { access, refresh } = state.tokens.issue_pair(user.id)?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(AuthResponse {
        access,
        refresh,
        user,
    }))
}

/// `GET /api/auth/user/`
#[utoipa::path(
    get,
    path = "/api/auth/user/",
    tag = "auth",
    operation_id = "auth.user",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ApiError),
    )
)]
pub async fn current_user(AuthUser(user): AuthUser) -> Result<ApiResponse<User>> {
    Ok(ApiResponse::success(user))
}

pub(crate) async fn ensure_email_free(state: &AppState, email: &str) -> Result<()> {
    if state.db.get_user_by_email(email).await?.is_some() {
        return Err(SarnetError::Validation(
            "A user is already registered with this e-mail address".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn ensure_username_free(state: &AppState, username: &str) -> Result<()> {
    if !is_valid_username(username) {
        return Err(SarnetError::Validation(USERNAME_RULE.to_string()));
    }
    if state.db.username_exists(username).await? {
        return Err(SarnetError::Validation(
            "A user with that username already exists".to_string(),
        ));
    }
    Ok(())
}
