use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{debug, error, info};

use super::repo_types::Message;
use crate::error::StoreError;

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    error!(error = %e, "message store unavailable");
    StoreError::StorageUnavailable(e.to_string())
}

/// Append-only direct-message log.
#[derive(Clone)]
pub struct MessageLog {
    db: SqlitePool,
}

impl MessageLog {
    /// Opens (creating if missing) the database and applies migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&db).await?;
        info!(%database_url, "message log ready");
        Ok(Self { db })
    }

    pub async fn send(
        &self,
        sender: &str,
        receiver: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender, receiver, content)
            VALUES (?, ?, ?)
            RETURNING id, sender, receiver, content, timestamp
            "#,
        )
        .bind(sender)
        .bind(receiver)
        .bind(content)
        .fetch_one(&self.db)
        .await
        .map_err(unavailable)?;
        debug!(id = message.id, %sender, %receiver, "message stored");
        Ok(message)
    }

    /// Messages between `a` and `b` in either direction, oldest first.
    pub async fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender, receiver, content, timestamp
              FROM messages
             WHERE (sender = ? AND receiver = ?)
                OR (sender = ? AND receiver = ?)
             ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(&self.db)
        .await
        .map_err(unavailable)
    }

    #[cfg(test)]
    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> (tempfile::TempDir, MessageLog) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("messages.db").display());
        let log = MessageLog::connect(&url).await.expect("connect");
        (dir, log)
    }

    #[tokio::test]
    async fn conversation_is_symmetric_and_ordered() {
        let (_dir, log) = open().await;
        let hi = log.send("alice", "bob", "hi").await.unwrap();
        log.send("alice", "carol", "unrelated").await.unwrap();
        let yo = log.send("bob", "alice", "yo").await.unwrap();
        assert!(yo.id > hi.id);
        assert!(yo.timestamp >= hi.timestamp);

        let ab = log.conversation("alice", "bob").await.unwrap();
        let contents: Vec<_> = ab.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "yo"]);
        assert_eq!(ab[0].sender, "alice");
        assert_eq!(ab[1].receiver, "alice");

        let ba = log.conversation("bob", "alice").await.unwrap();
        assert_eq!(ab, ba);
    }

    #[tokio::test]
    async fn empty_conversation_is_not_an_error() {
        let (_dir, log) = open().await;
        assert!(log.conversation("x", "y").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_to_self_form_their_own_conversation() {
        let (_dir, log) = open().await;
        log.send("dave", "dave", "note to self").await.unwrap();
        log.send("dave", "erin", "hey").await.unwrap();

        let own = log.conversation("dave", "dave").await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].content, "note to self");
    }

    #[tokio::test]
    async fn ids_strictly_increase() {
        let (_dir, log) = open().await;
        let mut last = 0;
        for i in 0..10 {
            let m = log.send("a", "b", &format!("m{i}")).await.unwrap();
            assert!(m.id > last);
            last = m.id;
        }
        let conv = log.conversation("b", "a").await.unwrap();
        assert_eq!(conv.len(), 10);
        assert_eq!(conv.last().unwrap().content, "m9");
    }

    #[tokio::test]
    async fn closed_store_is_unavailable() {
        let (_dir, log) = open().await;
        log.close().await;
        assert!(matches!(
            log.send("a", "b", "lost").await,
            Err(StoreError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn messages_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("m.db").display());
        MessageLog::connect(&url).await.unwrap().send("a", "b", "kept").await.unwrap();

        let log = MessageLog::connect(&url).await.unwrap();
        assert_eq!(log.conversation("a", "b").await.unwrap().len(), 1);
    }
}
