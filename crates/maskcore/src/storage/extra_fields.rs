//! Extra field repository (free-form mask attributes)

use super::models::ExtraField;
use super::Database;

pub struct ExtraFieldRepo<'a> {
    db: &'a Database,
}

impl<'a> ExtraFieldRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, mask_id: i32, name: &str, value: &str) -> Result<ExtraField, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, ExtraField>(
                    "INSERT INTO extra_fields (mask_id, name, value) VALUES ($1, $2, $3) RETURNING id, mask_id, name, value",
                )
                .bind(mask_id)
                .bind(name)
                .bind(value)
                .fetch_one(self.db.pool())
            })
            .await
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| sqlx::query("DELETE FROM extra_fields WHERE id = $1").bind(id).execute(self.db.pool()))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
