use sqlx::FromRow;
use time::PrimitiveDateTime;

/// Row of the `messages` table. `timestamp` is UTC, set by the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub timestamp: PrimitiveDateTime,
}
