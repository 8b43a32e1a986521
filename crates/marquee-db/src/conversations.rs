use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: i64,
    pub event_id: i64,
    pub host_id: i64,
    pub user_id: i64,
    pub last_message_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for ConversationRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        let updated_at_raw: String = row.try_get("updated_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            host_id: row.try_get("host_id")?,
            user_id: row.try_get("user_id")?,
            last_message_id: row.try_get("last_message_id")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
            updated_at: datetime_from_db_text(&updated_at_raw)?,
        })
    }
}

pub async fn get_conversation(
    pool: &DbPool,
    id: i64,
) -> Result<Option<ConversationRow>, DbError> {
    let row = sqlx::query_as::<_, ConversationRow>(
        "SELECT id, event_id, host_id, user_id, last_message_id, created_at, updated_at
         FROM conversations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_participants(
    pool: &DbPool,
    event_id: i64,
    host_id: i64,
    user_id: i64,
) -> Result<Option<ConversationRow>, DbError> {
    let row = sqlx::query_as::<_, ConversationRow>(
        "SELECT id, event_id, host_id, user_id, last_message_id, created_at, updated_at
         FROM conversations
         WHERE event_id = $1 AND host_id = $2 AND user_id = $3",
    )
    .bind(event_id)
    .bind(host_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a conversation for the (event, host, user) triple. When a
/// concurrent caller wins the insert race, the unique index on the
/// triple rejects ours and the existing row is re-read and returned,
/// so every racer observes the same conversation.
pub async fn create_conversation(
    pool: &DbPool,
    id: i64,
    event_id: i64,
    host_id: i64,
    user_id: i64,
) -> Result<ConversationRow, DbError> {
    let now = datetime_to_db_text(Utc::now());
    match sqlx::query_as::<_, ConversationRow>(
        "INSERT INTO conversations (id, event_id, host_id, user_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING id, event_id, host_id, user_id, last_message_id, created_at, updated_at",
    )
    .bind(id)
    .bind(event_id)
    .bind(host_id)
    .bind(user_id)
    .bind(&now)
    .fetch_one(pool)
    .await
    {
        Ok(row) => Ok(row),
        Err(err) if is_natural_key_unique_violation(&err) => {
            let existing = find_by_participants(pool, event_id, host_id, user_id).await?;
            if let Some(existing) = existing {
                return Ok(existing);
            }
            Err(DbError::Sqlx(err))
        }
        Err(err) => Err(DbError::Sqlx(err)),
    }
}

pub async fn set_last_message(
    pool: &DbPool,
    conversation_id: i64,
    message_id: i64,
) -> Result<(), DbError> {
    let now = datetime_to_db_text(Utc::now());
    sqlx::query("UPDATE conversations SET last_message_id = $1, updated_at = $2 WHERE id = $3")
        .bind(message_id)
        .bind(&now)
        .bind(conversation_id)
        .execute(pool)
        .await?;
    Ok(())
}

fn is_natural_key_unique_violation(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };

    let code_binding = db_err.code();
    let code = code_binding.as_deref().unwrap_or_default();
    if code == "23505" || code == "2067" || code == "1555" {
        return true;
    }

    let message = db_err.message().to_ascii_lowercase();
    message.contains("idx_conversations_natural_key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, DbPool};

    async fn seeded_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        crate::users::create_user(&pool, 10, "host", Some("Host Person"), None)
            .await
            .expect("host");
        crate::users::create_user(&pool, 20, "guest", None, None)
            .await
            .expect("guest");
        crate::events::create_event(&pool, 100, 10, "Launch Party", None)
            .await
            .expect("event");
        pool
    }

    #[tokio::test]
    async fn losing_insert_returns_the_existing_row() {
        let pool = seeded_pool().await;

        let first = create_conversation(&pool, 1000, 100, 10, 20)
            .await
            .expect("first insert");
        // Second insert for the same triple hits the unique index and
        // falls back to the existing row.
        let second = create_conversation(&pool, 1001, 100, 10, 20)
            .await
            .expect("conflicting insert");

        assert_eq!(first.id, second.id);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn set_last_message_touches_updated_at() {
        let pool = seeded_pool().await;
        let convo = create_conversation(&pool, 1000, 100, 10, 20)
            .await
            .expect("conversation");
        assert!(convo.last_message_id.is_none());

        let msg = crate::messages::create_message(
            &pool,
            2000,
            convo.id,
            20,
            Some("hello"),
            None,
            None,
            None,
        )
        .await
        .expect("message");
        set_last_message(&pool, convo.id, msg.id)
            .await
            .expect("set last message");

        let reloaded = get_conversation(&pool, convo.id)
            .await
            .expect("reload")
            .expect("exists");
        assert_eq!(reloaded.last_message_id, Some(msg.id));
        assert!(reloaded.updated_at >= convo.updated_at);
    }

    #[tokio::test]
    async fn blank_message_content_is_stored_as_null() {
        let pool = seeded_pool().await;
        let convo = create_conversation(&pool, 1000, 100, 10, 20)
            .await
            .expect("conversation");
        crate::files::create_file(&pool, 55, "https://files.test/photo.jpg")
            .await
            .expect("file");

        let msg = crate::messages::create_message(
            &pool,
            2000,
            convo.id,
            20,
            Some("   "),
            Some(55),
            None,
            None,
        )
        .await
        .expect("message");
        assert!(msg.content.is_none());
        assert_eq!(msg.image_id, Some(55));
    }
}
