//! Key/value settings editable from the admin panel

use super::models::Setting;
use super::Database;

pub struct SettingRepo<'a> {
    db: &'a Database,
}

impl<'a> SettingRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Setting>, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings ORDER BY key")
                    .fetch_all(self.db.pool())
            })
            .await
    }

    pub async fn upsert(&self, key: &str, value: &str) -> Result<Setting, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Setting>(
                    "INSERT INTO settings (key, value) VALUES ($1, $2) \
                     ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
                     RETURNING key, value, updated_at",
                )
                .bind(key)
                .bind(value)
                .fetch_one(self.db.pool())
            })
            .await
    }
}
