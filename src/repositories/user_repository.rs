//! Repositorio de usuarios, módulos e historial de acceso

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::user::{LoginOutcome, User, UserSummary};
use crate::services::auth_service::UserDirectory;
use crate::utils::errors::{not_found_error, AppResult};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, employee_id, full_name, email, role_id, status, created_at
            FROM users
            ORDER BY full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Inserta el usuario con sus módulos en una sola transacción
    pub async fn create(
        &self,
        employee_id: Option<i32>,
        full_name: &str,
        email: &str,
        password_hash: &str,
        role_id: i32,
        modules: &[i32],
    ) -> AppResult<UserSummary> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, UserSummary>(
            r#"
            INSERT INTO users (employee_id, full_name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, employee_id, full_name, email, role_id, status, created_at
            "#,
        )
        .bind(employee_id)
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_modules (user_id, module_id) SELECT $1, UNNEST($2::INT[])",
        )
        .bind(user.id)
        .bind(modules)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("👤 Usuario {} creado con módulos {:?}", user.email, modules);
        Ok(user)
    }

    /// Reemplaza los módulos del usuario
    pub async fn set_modules(&self, user_id: i32, modules: &[i32]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(not_found_error("User", user_id));
        }

        sqlx::query("DELETE FROM user_modules WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO user_modules (user_id, module_id) SELECT $1, UNNEST($2::INT[])",
        )
        .bind(user_id)
        .bind(modules)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn modules_for(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let modules: Vec<i32> = sqlx::query_scalar(
            "SELECT module_id FROM user_modules WHERE user_id = $1 ORDER BY module_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(modules)
    }

    async fn record_failure(&self, user_id: i32) -> AppResult<i32> {
        let attempts: i32 = sqlx::query_scalar(
            "UPDATE users SET failed_attempts = failed_attempts + 1 WHERE id = $1 RETURNING failed_attempts",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(attempts)
    }

    async fn block(&self, user_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET status = 'blocked' WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_failures(&self, user_id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET failed_attempts = 0 WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn log_attempt(
        &self,
        user_id: Option<i32>,
        email: &str,
        outcome: LoginOutcome,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO login_history (user_id, email, outcome) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(outcome)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
