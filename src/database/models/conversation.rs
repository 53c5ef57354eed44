use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One direct-message thread and the class login it remembered.
///
/// Created on the first recognized login command from a thread; the login
/// is overwritten on repeated commands. Records are never deleted by the
/// bot itself.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub thread_id: String,
    pub class_login: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub async fn find_by_thread_id(
        pool: &sqlx::SqlitePool,
        thread_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            "SELECT thread_id, class_login, created_at, updated_at FROM conversations WHERE thread_id = ?"
        )
        .bind(thread_id)
        .fetch_optional(pool)
        .await
    }

    /// Inserts the thread if absent, otherwise overwrites its class login.
    ///
    /// Last-writer-wins; the dispatcher processes one thread's messages
    /// sequentially, so concurrent upserts for the same thread never race.
    pub async fn upsert(
        pool: &sqlx::SqlitePool,
        thread_id: &str,
        class_login: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO conversations (thread_id, class_login, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET class_login = excluded.class_login, updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id)
        .bind(class_login)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        // Fetch the stored record
        Self::find_by_thread_id(pool, thread_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
