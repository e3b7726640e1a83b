use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub likes: u64,
}
