use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::header,
};
use tracing::debug;

use parley_types::api::CredentialsRequest;

/// Credentials from a JSON or urlencoded form body.
///
/// Never rejects: an unreadable body yields empty credentials, so the handler
/// answers with its own `{ "error": ... }` (400 on signup, 401 on login).
pub struct Credentials(pub CredentialsRequest);

impl<S> FromRequest<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let parsed = if is_form {
            Form::<CredentialsRequest>::from_request(req, state)
                .await
                .map(|Form(creds)| creds)
                .map_err(|e| e.body_text())
        } else {
            Json::<CredentialsRequest>::from_request(req, state)
                .await
                .map(|Json(creds)| creds)
                .map_err(|e| e.body_text())
        };

        Ok(Self(parsed.unwrap_or_else(|reason| {
            debug!("unreadable credentials body: {}", reason);
            CredentialsRequest::default()
        })))
    }
}
