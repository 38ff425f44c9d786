//! Review repository

use super::models::{Review, ReviewFields};
use super::Database;

const REVIEW_COLUMNS: &str = "id, mask_id, author, text, rating, created_at";

pub struct ReviewRepo<'a> {
    db: &'a Database,
}

impl<'a> ReviewRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All reviews, optionally restricted to one mask, newest first.
    pub async fn list(&self, mask_id: Option<i32>) -> Result<Vec<Review>, sqlx::Error> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE ($1::INTEGER IS NULL OR mask_id = $1) ORDER BY created_at DESC, id DESC"
        );
        self.db
            .run(|| sqlx::query_as::<_, Review>(&sql).bind(mask_id).fetch_all(self.db.pool()))
            .await
    }

    pub async fn create(
        &self,
        mask_id: i32,
        author: &str,
        text: &str,
        rating: Option<i16>,
    ) -> Result<Review, sqlx::Error> {
        let sql =
            format!("INSERT INTO reviews (mask_id, author, text, rating) VALUES ($1, $2, $3, $4) RETURNING {REVIEW_COLUMNS}");
        self.db
            .run(|| {
                sqlx::query_as::<_, Review>(&sql)
                    .bind(mask_id)
                    .bind(author)
                    .bind(text)
                    .bind(rating)
                    .fetch_one(self.db.pool())
            })
            .await
    }

    pub async fn update(&self, id: i32, fields: &ReviewFields) -> Result<Option<Review>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE reviews SET
                mask_id = COALESCE($2, mask_id),
                author = COALESCE($3, author),
                text = COALESCE($4, text),
                rating = COALESCE($5, rating)
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, Review>(&sql)
                    .bind(id)
                    .bind(fields.mask_id)
                    .bind(fields.author.as_deref())
                    .bind(fields.text.as_deref())
                    .bind(fields.rating)
                    .fetch_optional(self.db.pool())
            })
            .await
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(self.db.pool()))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
