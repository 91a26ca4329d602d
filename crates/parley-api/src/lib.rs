//! REST surface: signup, login, user listing and conversation history.

pub mod auth;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod token;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use parley_db::Database;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    /// Gate `/api/users` and `/api/messages` behind a bearer token.
    pub require_auth: bool,
}

/// All `/api` routes, with state applied.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/signup", post(auth::signup))
        .route("/api/login", post(auth::login));

    let mut read_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/messages/{user_id}/{other_id}", get(messages::get_history));

    if state.require_auth {
        read_routes = read_routes.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));
    }

    Router::new()
        .merge(public_routes)
        .merge(read_routes)
        .with_state(state)
}

/// Run blocking store or hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    pub const SECRET: &str = "test-secret";

    pub fn state(require_auth: bool) -> AppState {
        Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            jwt_secret: SECRET.to_string(),
            require_auth,
        })
    }

    pub async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        call(state, req).await
    }

    /// POST an arbitrary body with an optional Content-Type.
    pub async fn post_raw(
        state: &AppState,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method("POST").uri(uri);
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        call(state, req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn call(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
