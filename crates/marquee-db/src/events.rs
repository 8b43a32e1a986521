use crate::{datetime_from_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: i64,
    pub creator_id: i64,
    pub name: String,
    pub cover_file_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for EventRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            creator_id: row.try_get("creator_id")?,
            name: row.try_get("name")?,
            cover_file_id: row.try_get("cover_file_id")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
        })
    }
}

pub async fn create_event(
    pool: &DbPool,
    id: i64,
    creator_id: i64,
    name: &str,
    cover_file_id: Option<i64>,
) -> Result<EventRow, DbError> {
    let row = sqlx::query_as::<_, EventRow>(
        "INSERT INTO events (id, creator_id, name, cover_file_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id, creator_id, name, cover_file_id, created_at",
    )
    .bind(id)
    .bind(creator_id)
    .bind(name)
    .bind(cover_file_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_event(pool: &DbPool, id: i64) -> Result<Option<EventRow>, DbError> {
    let row = sqlx::query_as::<_, EventRow>(
        "SELECT id, creator_id, name, cover_file_id, created_at
         FROM events WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
