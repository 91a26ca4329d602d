use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, info};
use uuid::Uuid;

use parley_db::StoreError;
use parley_types::api::{AuthResponse, CredentialsRequest, IdentifierKind, UserSummary};

use crate::extract::Credentials;
use crate::{ApiError, AppState, blocking, token};

/// Non-empty (type, value, password), or `None` if any is missing.
fn credentials(req: CredentialsRequest) -> Option<(String, String, String)> {
    let non_empty = |field: Option<String>| field.filter(|s| !s.is_empty());
    Some((
        non_empty(req.kind)?,
        non_empty(req.value)?,
        non_empty(req.password)?,
    ))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Hash checked against when the account does not exist, so an unknown
/// identifier costs the same as a wrong password.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("parley-dummy-password").ok())
        .as_deref()
}

fn password_matches(password: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn summary(id: Uuid, kind: IdentifierKind, value: String) -> UserSummary {
    match kind {
        IdentifierKind::Email => UserSummary { id, email: Some(value), phone: None },
        IdentifierKind::Phone => UserSummary { id, email: None, phone: Some(value) },
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Credentials(req): Credentials,
) -> Result<impl IntoResponse, ApiError> {
    let (kind, value, password) = credentials(req).ok_or(ApiError::MissingFields)?;
    let kind = IdentifierKind::parse(&kind).ok_or(ApiError::UnsupportedType)?;

    let user_id = Uuid::new_v4();
    let db = state.db.clone();
    let stored_value = value.clone();
    blocking(move || {
        if db.get_user_by_identifier(kind, &stored_value)?.is_some() {
            return Err(ApiError::UserExists);
        }

        // Hash password with Argon2id
        let password_hash = hash_password(&password)?;

        // A concurrent signup can still win the race; the unique index catches it
        db.create_user(
            &user_id.to_string(),
            kind,
            &stored_value,
            &password_hash,
            chrono::Utc::now(),
        )
        .map_err(|e| match e {
            StoreError::Duplicate => ApiError::UserExists,
            other => other.into(),
        })
    })
    .await?;

    info!("new {} account {}", kind.as_str(), user_id);

    let token = token::issue(&state.jwt_secret, user_id, kind, &value)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: summary(user_id, kind, value),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Credentials(req): Credentials,
) -> Result<impl IntoResponse, ApiError> {
    let (kind, value, password) = credentials(req).ok_or(ApiError::InvalidCredentials)?;
    let kind = IdentifierKind::parse(&kind).ok_or(ApiError::InvalidCredentials)?;

    let db = state.db.clone();
    let lookup_value = value.clone();
    let user = blocking(move || {
        let Some(row) = db.get_user_by_identifier(kind, &lookup_value)? else {
            if let Some(dummy) = dummy_hash() {
                password_matches(&password, dummy)?;
            }
            return Ok(None);
        };
        Ok(password_matches(&password, &row.password_hash)?.then_some(row))
    })
    .await?;

    let Some(user) = user else {
        debug!("failed login for {} {}", kind.as_str(), value);
        return Err(ApiError::InvalidCredentials);
    };

    let user = user.summary()?;
    let token = token::issue(&state.jwt_secret, user.id, kind, &value)?;

    Ok(Json(AuthResponse { token, user }))
}
