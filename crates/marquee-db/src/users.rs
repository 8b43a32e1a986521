use crate::{datetime_from_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_file_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Name shown in conversation views; falls back to the username
    /// when no display name is set.
    pub fn full_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for UserRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            avatar_file_id: row.try_get("avatar_file_id")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
        })
    }
}

pub async fn create_user(
    pool: &DbPool,
    id: i64,
    username: &str,
    display_name: Option<&str>,
    avatar_file_id: Option<i64>,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, username, display_name, avatar_file_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id, username, display_name, avatar_file_id, created_at",
    )
    .bind(id)
    .bind(username)
    .bind(display_name)
    .bind(avatar_file_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, display_name, avatar_file_id, created_at
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
