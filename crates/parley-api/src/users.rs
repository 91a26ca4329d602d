use axum::{Json, extract::State};

use parley_types::api::UserSummary;

use crate::{ApiError, AppState, blocking};

/// Every registered account, oldest first.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let db = state.db.clone();
    let users: Vec<UserSummary> = blocking(move || {
        db.list_users()?
            .iter()
            .map(|row| row.summary().map_err(ApiError::from))
            .collect()
    })
    .await?;

    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{send, state};

    #[tokio::test]
    async fn lists_both_identifier_kinds() {
        let state = state(false);
        for creds in [
            json!({"type": "email", "value": "a@example.com", "password": "pw"}),
            json!({"type": "phone", "value": "+100", "password": "pw"}),
        ] {
            send(&state, "POST", "/api/signup", Some(creds), None).await;
        }

        let (status, body) = send(&state, "GET", "/api/users", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["email"], "a@example.com");
        assert_eq!(users[1]["phone"], "+100");
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn bearer_required_when_enabled() {
        let state = state(true);
        let (status, body) = send(
            &state,
            "POST",
            "/api/signup",
            Some(json!({"type": "email", "value": "a@example.com", "password": "pw"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&state, "GET", "/api/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&state, "GET", "/api/users", None, Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&state, "GET", "/api/users", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
