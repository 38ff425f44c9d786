//! User repository

use super::models::{User, UserFields};
use super::Database;

const USER_COLUMNS: &str = "id, telegram_id, first_name, last_name, phone, is_bot_available, created_at, updated_at";

/// User repository
pub struct UserRepo<'a> {
    db: &'a Database,
}

impl<'a> UserRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1");
        self.db
            .run(|| {
                sqlx::query_as::<_, User>(&sql)
                    .bind(telegram_id)
                    .fetch_optional(self.db.pool())
            })
            .await
    }

    /// Returns the existing user or creates one. Existing users are not modified.
    pub async fn register(&self, telegram_id: &str, first_name: Option<&str>) -> Result<User, sqlx::Error> {
        if let Some(user) = self.find_by_telegram_id(telegram_id).await? {
            return Ok(user);
        }

        // A concurrent register may insert between the lookup and here; the
        // no-op update makes the insert return the existing row instead of failing.
        let sql = format!(
            r#"
            INSERT INTO users (telegram_id, first_name)
            VALUES ($1, $2)
            ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
            RETURNING {USER_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, User>(&sql)
                    .bind(telegram_id)
                    .bind(first_name)
                    .fetch_one(self.db.pool())
            })
            .await
    }

    /// Bot subscription: create the user or mark an existing one reachable
    /// and refresh its display name. A single statement.
    pub async fn upsert_subscriber(&self, telegram_id: &str, first_name: &str) -> Result<User, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO users (telegram_id, first_name, is_bot_available)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (telegram_id) DO UPDATE
                SET is_bot_available = TRUE,
                    first_name = EXCLUDED.first_name,
                    updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, User>(&sql)
                    .bind(telegram_id)
                    .bind(first_name)
                    .fetch_one(self.db.pool())
            })
            .await
    }

    /// Partial update; returns `None` when no such user exists.
    pub async fn update(&self, telegram_id: &str, fields: &UserFields) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                is_bot_available = COALESCE($5, is_bot_available),
                updated_at = NOW()
            WHERE telegram_id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        self.db
            .run(|| {
                sqlx::query_as::<_, User>(&sql)
                    .bind(telegram_id)
                    .bind(fields.first_name.as_deref())
                    .bind(fields.last_name.as_deref())
                    .bind(fields.phone.as_deref())
                    .bind(fields.is_bot_available)
                    .fetch_optional(self.db.pool())
            })
            .await
    }

    pub async fn set_bot_available(&self, telegram_id: &str, available: bool) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| {
                sqlx::query("UPDATE users SET is_bot_available = $2, updated_at = NOW() WHERE telegram_id = $1")
                    .bind(telegram_id)
                    .bind(available)
                    .execute(self.db.pool())
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        self.db
            .run(|| sqlx::query_as::<_, User>(&sql).fetch_all(self.db.pool()))
            .await
    }

    /// Users the bot may message.
    pub async fn list_reachable(&self) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE is_bot_available ORDER BY id");
        self.db
            .run(|| sqlx::query_as::<_, User>(&sql).fetch_all(self.db.pool()))
            .await
    }

    /// Returns whether a row was deleted.
    pub async fn delete(&self, telegram_id: &str) -> Result<bool, sqlx::Error> {
        let result = self
            .db
            .run(|| {
                sqlx::query("DELETE FROM users WHERE telegram_id = $1")
                    .bind(telegram_id)
                    .execute(self.db.pool())
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
