use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{auth::services::AuthUser, error::reject, state::AppState};

use super::dto::{MessageResponse, SendMessageRequest};

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/messages/:peer", get(get_conversation).post(send_message))
}

/// Peers are free-form usernames; they are not checked against the user store.
#[instrument(skip(state, body))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(peer): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, String)> {
    let message = state
        .messages
        .send(&username, &peer, &body.content)
        .await
        .map_err(reject)?;
    info!(id = message.id, from = %username, to = %peer, "message sent");
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[instrument(skip(state))]
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(peer): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, (StatusCode, String)> {
    let messages = state
        .messages
        .conversation(&username, &peer)
        .await
        .map_err(reject)?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
