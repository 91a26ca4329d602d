use axum::{
    Json,
    extract::{Path, State},
};

use parley_types::models::ChatMessage;

use crate::{ApiError, AppState, blocking};

/// Full conversation between two users in either direction, oldest first.
/// Unbounded: no pagination.
pub async fn get_history(
    State(state): State<AppState>,
    Path((user_id, other_id)): Path<(String, String)>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let db = state.db.clone();
    let messages: Vec<ChatMessage> = blocking(move || {
        db.get_conversation(&user_id, &other_id)?
            .into_iter()
            .map(|row| row.into_message().map_err(ApiError::from))
            .collect()
    })
    .await?;

    Ok(Json(messages))
}
