use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised by the user, post and message stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Only produced while loading persisted files; the loaders recover from it.
    #[error("malformed persisted state in {path}: {reason}")]
    MalformedPersistedState { path: String, reason: String },
    #[error("object store: {0}")]
    Remote(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
            StoreError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::MalformedPersistedState { .. }
            | StoreError::Remote(_)
            | StoreError::Io(_)
            | StoreError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Maps a store error onto the `(StatusCode, String)` rejection used by handlers.
pub fn reject(e: StoreError) -> (StatusCode, String) {
    (e.status(), e.to_string())
}

pub fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(StoreError::AlreadyExists("a".into()).status(), StatusCode::CONFLICT);
        assert_eq!(StoreError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(StoreError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(StoreError::Unauthorized("bob".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            StoreError::StorageUnavailable("db".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            StoreError::Remote("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn reject_carries_message() {
        let (status, msg) = reject(StoreError::NotFound("cat.png".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(msg.contains("cat.png"));
    }
}
