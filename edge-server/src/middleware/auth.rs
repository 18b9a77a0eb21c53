//! Operator authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{AppError, AppState};

/// Header carrying the operator token
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Middleware: Require the configured admin token
pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .config
        .admin_token
        .as_deref()
        .ok_or(AppError::Forbidden)?;

    let presented = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    // Digests are fixed length, so the comparison does not leak token length
    if hash_token(presented) != hash_token(expected) {
        tracing::warn!("Rejected operator request to {}", req.uri().path());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}

fn hash_token(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}
