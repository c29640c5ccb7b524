//! PostgreSQL-backed [`Store`].

use service_core::axum::async_trait;
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{user::UserRow, NewUser, Session, User, UserStatus, UserType};
use crate::services::store::Store;

const USER_COLUMNS: &str = "id, user_type, status, name, email, job_title, idp_username, \
                            accepted_terms_at, created_at, updated_at";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_user(row: UserRow) -> Result<User, AppError> {
    User::try_from(row)
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Corrupt user row: {}", e)))
}

#[async_trait]
impl Store for Database {
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    async fn find_user_by_type_and_username(
        &self,
        user_type: UserType,
        idp_username: &str,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT {} FROM users WHERE user_type = $1 AND idp_username = $2",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_type.as_str())
            .bind(idp_username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(into_user).transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO users (id, user_type, status, name, email, job_title, idp_username) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(Uuid::new_v4())
            .bind(user.user_type.as_str())
            .bind(user.status.as_str())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.job_title)
            .bind(&user.idp_username)
            .fetch_one(&self.pool)
            .await?;

        into_user(row)
    }

    async fn update_user_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
    ) -> Result<User, AppError> {
        let query = format!(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        into_user(row)
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, access_token)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, access_token, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(access_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, access_token, created_at, updated_at FROM sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
