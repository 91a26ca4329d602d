use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use parley_db::StoreError;
use parley_types::api::ErrorBody;

/// Every failure a REST handler can report.
///
/// Server-side variants all render as a bare "Server error"; their detail
/// only goes to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("All fields required")]
    MissingFields,

    #[error("Unsupported identifier type")]
    UnsupportedType,

    #[error("User already exists")]
    UserExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hash: {0}")]
    Hash(String),

    #[error("blocking task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields | Self::UnsupportedType => StatusCode::BAD_REQUEST,
            Self::UserExists => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Token(_) | Self::Hash(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::Hash(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("request failed: {}", self);
            "Server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
