use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Result, SarnetError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub token_type: TokenType,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh pair as handed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and checks HS256 tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_ttl_minutes.max(1)),
            refresh_ttl: Duration::days(config.refresh_ttl_days.max(1)),
        }
    }

    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    pub fn issue(&self, user_id: i64, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            user_id,
            token_type,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Decode and validate a token; with `expected`, the token type must match.
    pub fn verify(&self, token: &str, expected: Option<TokenType>) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;

        match expected {
            Some(kind) if data.claims.token_type != kind => Err(SarnetError::Unauthorized(
                format!("Token has wrong type, expected {kind} token"),
            )),
            _ => Ok(data.claims),
        }
    }
}
