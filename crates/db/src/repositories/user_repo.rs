//! Repository for the `users` table.

use sqlx::PgPool;
use vantage_core::types::DbId;

use crate::models::user::User;

const COLUMNS: &str = "id, email, name, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, email: &str, name: &str) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Email address of a user, used as the notification recipient.
    pub async fn find_email(pool: &PgPool, id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
