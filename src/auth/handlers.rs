use axum::{
    extract::{FromRef, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, CredentialsRequest, PublicUser},
        services::{AuthUser, JwtKeys},
    },
    error::{internal, reject},
    images::services::set_profile_picture,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/profile-picture", post(upload_profile_picture))
}

fn public_user(state: &AppState, username: String) -> PublicUser {
    let profile_pic = state
        .users
        .get(&username)
        .and_then(|u| u.profile_pic)
        .unwrap_or_else(|| state.config.default_profile_pic.clone());
    PublicUser {
        username,
        profile_pic,
    }
}

fn issue_token(state: &AppState, username: String) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let token = JwtKeys::from_ref(state).sign(&username).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        internal(e)
    })?;
    Ok(Json(AuthResponse {
        token,
        user: public_user(state, username),
    }))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    if payload.username.is_empty() {
        warn!("empty username");
        return Err((StatusCode::BAD_REQUEST, "Username is required".into()));
    }

    if let Err(e) = state.users.create(&payload.username, &payload.password) {
        warn!(error = %e, username = %payload.username, "signup failed");
        return Err(reject(e));
    }

    info!(username = %payload.username, "user signed up");
    Ok((StatusCode::CREATED, issue_token(&state, payload.username)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    if let Err(e) = state.users.authenticate(&payload.username, &payload.password) {
        warn!(username = %payload.username, "login rejected");
        return Err(reject(e));
    }

    info!(username = %payload.username, "user logged in");
    issue_token(&state, payload.username)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Json<PublicUser> {
    Json(public_user(&state, username))
}

/// POST /me/profile-picture (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    mut mp: Multipart,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let mut data = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("file") {
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
            );
        }
    }
    let data = data
        .filter(|d| !d.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "No file".to_string()))?;

    match set_profile_picture(&state, &username, data).await {
        Ok(url) => {
            info!(%username, %url, "profile picture updated");
            Ok(Json(public_user(&state, username)))
        }
        Err(e) if e.root_cause().is::<image::ImageError>() => {
            warn!(error = %e, %username, "profile picture is not a readable image");
            Err((StatusCode::BAD_REQUEST, "Unsupported image".into()))
        }
        Err(e) => {
            error!(error = %e, %username, "profile picture upload failed");
            Err(internal(e))
        }
    }
}
