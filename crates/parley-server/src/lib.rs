pub mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderMap, HeaderName, HeaderValue, Method, header, request::Parts},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use parley_api::token::{bearer_token, verify};
use parley_api::{ApiError, AppStateInner};
use parley_gateway::{Gateway, connection};

use crate::config::Config;

#[derive(Clone)]
struct SocketState {
    gateway: Gateway,
    jwt_secret: String,
}

#[derive(Debug, Deserialize)]
struct SocketParams {
    token: Option<String>,
}

/// Full HTTP surface: REST routes, the socket endpoint and the liveness banner.
pub fn app(config: &Config, gateway: Gateway) -> Router {
    let api_state = Arc::new(AppStateInner {
        db: gateway.db().clone(),
        jwt_secret: config.jwt_secret.clone(),
        require_auth: config.require_auth,
    });

    let socket_route = Router::new()
        .route("/socket", get(ws_upgrade))
        .with_state(SocketState {
            gateway,
            jwt_secret: config.jwt_secret.clone(),
        });

    let mut app = Router::new()
        .route("/", get(|| async { "Chat API server is running" }))
        .merge(parley_api::router(api_state))
        .merge(socket_route);

    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    app.layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// Hardening headers added to every response that does not already set them.
pub const SECURITY_HEADERS: [(&str, &str); 9] = [
    ("content-security-policy", "default-src 'self'; frame-ancestors 'self'; object-src 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
];

fn cors_layer(config: &Config) -> CorsLayer {
    let config = config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin.to_str().is_ok_and(|o| config.origin_allowed(o))
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// A token (query `?token=` or bearer header) binds the socket to a user;
/// no token gives an anonymous socket, a bad token is refused.
async fn ws_upgrade(
    State(state): State<SocketState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.token.as_deref().or_else(|| bearer_token(&headers));

    let user_id = match token {
        Some(token) => match verify(&state.jwt_secret, token) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                warn!("socket upgrade with invalid token: {}", e);
                return ApiError::Unauthorized.into_response();
            }
        },
        None => None,
    };

    ws.on_upgrade(move |socket| connection::handle_connection(socket, state.gateway, user_id))
}
