//! Admin account repository

use super::models::Admin;
use super::Database;

pub struct AdminRepo<'a> {
    db: &'a Database,
}

impl<'a> AdminRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Admin>(
                    "SELECT id, username, password_hash, created_at FROM admins WHERE username = $1",
                )
                .bind(username)
                .fetch_optional(self.db.pool())
            })
            .await
    }

    /// Fails with a unique violation if the username is taken.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<Admin, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Admin>(
                    "INSERT INTO admins (username, password_hash) VALUES ($1, $2) \
                     RETURNING id, username, password_hash, created_at",
                )
                .bind(username)
                .bind(password_hash)
                .fetch_one(self.db.pool())
            })
            .await
    }

    /// Creates the admin or resets its password.
    pub async fn upsert(&self, username: &str, password_hash: &str) -> Result<Admin, sqlx::Error> {
        self.db
            .run(|| {
                sqlx::query_as::<_, Admin>(
                    "INSERT INTO admins (username, password_hash) VALUES ($1, $2) \
                     ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash \
                     RETURNING id, username, password_hash, created_at",
                )
                .bind(username)
                .bind(password_hash)
                .fetch_one(self.db.pool())
            })
            .await
    }
}
