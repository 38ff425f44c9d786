//! Feature repository (per-mask selling points)

use super::models::{Feature, FeatureFields};
use super::Database;

pub struct FeatureRepo<'a> {
    db: &'a Database,
}

impl<'a> FeatureRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All features, optionally restricted to one mask.
    pub async fn list(&self, mask_id: Option<i32>) -> Result<Vec<Feature>, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Feature>(
                    "SELECT id, mask_id, title, description FROM features \
                     WHERE ($1::INTEGER IS NULL OR mask_id = $1) ORDER BY id",
                )
                .bind(mask_id)
                .fetch_all(self.db.pool())
            })
            .await
    }

    pub async fn create(&self, mask_id: i32, title: &str, description: Option<&str>) -> Result<Feature, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Feature>(
                    "INSERT INTO features (mask_id, title, description) VALUES ($1, $2, $3) \
                     RETURNING id, mask_id, title, description",
                )
                .bind(mask_id)
                .bind(title)
                .bind(description)
                .fetch_one(self.db.pool())
            })
            .await
    }

    pub async fn update(&self, id: i32, fields: &FeatureFields) -> Result<Option<Feature>, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Feature>(
                    r#"
                    UPDATE features SET
                        mask_id = COALESCE($2, mask_id),
                        title = COALESCE($3, title),
                        description = COALESCE($4, description)
                    WHERE id = $1
                    RETURNING id, mask_id, title, description
                    "#,
                )
                .bind(id)
                .bind(fields.mask_id)
                .bind(fields.title.as_deref())
                .bind(fields.description.as_deref())
                .fetch_optional(self.db.pool())
            })
            .await
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| sqlx::query("DELETE FROM features WHERE id = $1").bind(id).execute(self.db.pool()))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
