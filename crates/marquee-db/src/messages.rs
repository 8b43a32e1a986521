use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub user_id: i64,
    pub content: Option<String>,
    pub image_id: Option<i64>,
    pub video_id: Option<i64>,
    pub audio_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for MessageRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        let updated_at_raw: String = row.try_get("updated_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            image_id: row.try_get("image_id")?,
            video_id: row.try_get("video_id")?,
            audio_id: row.try_get("audio_id")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
            updated_at: datetime_from_db_text(&updated_at_raw)?,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create_message(
    pool: &DbPool,
    id: i64,
    conversation_id: i64,
    user_id: i64,
    content: Option<&str>,
    image_id: Option<i64>,
    video_id: Option<i64>,
    audio_id: Option<i64>,
) -> Result<MessageRow, DbError> {
    let normalized_content = content.map(str::trim).filter(|value| !value.is_empty());
    let now = datetime_to_db_text(Utc::now());
    let row = sqlx::query_as::<_, MessageRow>(
        "INSERT INTO messages (id, conversation_id, user_id, content, image_id, video_id, audio_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING id, conversation_id, user_id, content, image_id, video_id, audio_id, created_at, updated_at",
    )
    .bind(id)
    .bind(conversation_id)
    .bind(user_id)
    .bind(normalized_content)
    .bind(image_id)
    .bind(video_id)
    .bind(audio_id)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_message(pool: &DbPool, id: i64) -> Result<Option<MessageRow>, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(
        "SELECT id, conversation_id, user_id, content, image_id, video_id, audio_id, created_at, updated_at
         FROM messages WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn count_conversation_messages(
    pool: &DbPool,
    conversation_id: i64,
) -> Result<i64, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
