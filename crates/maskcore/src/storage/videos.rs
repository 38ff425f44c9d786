//! Video repository

use super::models::{Video, VideoFields};
use super::Database;

const VIDEO_COLUMNS: &str = "id, title, url, description, thumbnail_url, created_at";

pub struct VideoRepo<'a> {
    db: &'a Database,
}

impl<'a> VideoRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Video>, sqlx::Error> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos ORDER BY id");
        self.db
            .run(|| sqlx::query_as::<_, Video>(&sql).fetch_all(self.db.pool()))
            .await
    }

    pub async fn find(&self, id: i32) -> Result<Option<Video>, sqlx::Error> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1");
        self.db
            .run(|| sqlx::query_as::<_, Video>(&sql).bind(id).fetch_optional(self.db.pool()))
            .await
    }

    pub async fn create(&self, title: &str, url: &str, fields: &VideoFields) -> Result<Video, sqlx::Error> {
        let sql = format!(
            "INSERT INTO videos (title, url, description, thumbnail_url) VALUES ($1, $2, $3, $4) RETURNING {VIDEO_COLUMNS}"
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, Video>(&sql)
                    .bind(title)
                    .bind(url)
                    .bind(fields.description.as_deref())
                    .bind(fields.thumbnail_url.as_deref())
                    .fetch_one(self.db.pool())
            })
            .await
    }

    pub async fn update(&self, id: i32, fields: &VideoFields) -> Result<Option<Video>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE videos SET
                title = COALESCE($2, title),
                url = COALESCE($3, url),
                description = COALESCE($4, description),
                thumbnail_url = COALESCE($5, thumbnail_url)
            WHERE id = $1
            RETURNING {VIDEO_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, Video>(&sql)
                    .bind(id)
                    .bind(fields.title.as_deref())
                    .bind(fields.url.as_deref())
                    .bind(fields.description.as_deref())
                    .bind(fields.thumbnail_url.as_deref())
                    .fetch_optional(self.db.pool())
            })
            .await
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| sqlx::query("DELETE FROM videos WHERE id = $1").bind(id).execute(self.db.pool()))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
