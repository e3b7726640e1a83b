use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::Message;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender: m.sender,
            receiver: m.receiver,
            content: m.content,
            timestamp: m.timestamp.assume_utc(),
        }
    }
}
