use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::token::{bearer_token, verify};
use crate::{ApiError, AppState};

/// Extract and validate the JWT from the Authorization header.
/// Valid claims are stored as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let claims = verify(&state.jwt_secret, token).map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
