use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::services::AuthUser,
    error::{reject, StoreError},
    state::AppState,
};

use super::dto::LikeResponse;
use super::filename::secure_filename;
use super::registry::Post;

pub const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/:filename", get(get_post))
        .route("/posts/:filename/like", post(like_post))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post)) // multipart, field `file`
        .route("/posts/:filename", delete(delete_post))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
}

#[instrument(skip(state))]
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<Post>> {
    Json(state.posts.list())
}

/// Target of the `Location` header set on upload.
#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Post>, (StatusCode, String)> {
    state
        .posts
        .get(&filename)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "File not found".into()))
}

/// POST /posts (multipart). Always answers 201 with the stored post.
#[instrument(skip(state, mp))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<Post>), (StatusCode, String)> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        upload = Some((original, content_type, data));
    }

    let Some((original, content_type, data)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "No file".into()));
    };
    let Some(filename) = secure_filename(&original) else {
        warn!(%original, "upload without a usable filename");
        return Err((StatusCode::BAD_REQUEST, "No filename".into()));
    };

    let post = state
        .posts
        .create(&filename, &username, data, &content_type)
        .await
        .map_err(|e| {
            error!(error = %e, %filename, "create post failed");
            reject(e)
        })?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/posts/{}", post.filename)) {
        headers.insert(header::LOCATION, location);
    }
    info!(%filename, %username, "upload stored");
    Ok((StatusCode::CREATED, headers, Json(post)))
}

#[instrument(skip(state))]
pub async fn like_post(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<LikeResponse>, (StatusCode, String)> {
    match state.posts.like(&filename) {
        Ok(likes) => Ok(Json(LikeResponse { likes })),
        Err(StoreError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "File not found".into())),
        Err(e) => Err(reject(e)),
    }
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(filename): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .posts
        .delete(&filename, &username)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
