//! Bearer-token authentication for the protected routes.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET` and must carry `exp`.
//! With no secret configured every protected request is rejected.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::routes::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT_SECRET is not configured")]
    NotConfigured,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Sign a token for `subject` valid for `ttl`.
pub fn issue_token(secret: &str, subject: &str, ttl: chrono::Duration) -> Result<String, AuthError> {
    let claims = Claims {
        sub: subject.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware rejecting requests without a valid bearer token.
pub async fn require_auth(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let checked = state
        .config
        .server
        .jwt_secret
        .as_deref()
        .ok_or(AuthError::NotConfigured)
        .and_then(|secret| {
            let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
            verify_token(secret, token)
        });

    match checked {
        Ok(claims) => {
            tracing::debug!("Authenticated request for {}", claims.sub);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejected request: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Unauthorized" })),
            )
                .into_response()
        }
    }
}
