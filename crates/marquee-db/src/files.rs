use crate::{DbError, DbPool};

pub async fn create_file(pool: &DbPool, id: i64, url: &str) -> Result<(), DbError> {
    sqlx::query("INSERT INTO files (id, url) VALUES ($1, $2)")
        .bind(id)
        .bind(url)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_file_url(pool: &DbPool, id: i64) -> Result<Option<String>, DbError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT url FROM files WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(url,)| url))
}
