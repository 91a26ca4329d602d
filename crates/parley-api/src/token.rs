use axum::http::{HeaderMap, header};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use parley_types::api::{Claims, IdentifierKind};

/// Sign a token for `user_id`, embedding the identifying value it signed up with.
pub fn issue(
    secret: &str,
    user_id: Uuid,
    kind: IdentifierKind,
    value: &str,
) -> jsonwebtoken::errors::Result<String> {
    let (email, phone) = match kind {
        IdentifierKind::Email => (Some(value.to_string()), None),
        IdentifierKind::Phone => (None, Some(value.to_string())),
    };
    let claims = Claims {
        sub: user_id,
        email,
        phone,
        iat: chrono::Utc::now().timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Check the signature and return the claims. Tokens carry no expiry.
pub fn verify(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// The token from an `Authorization: Bearer ...` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
