//! Repositorio genérico de catálogos

use sqlx::PgPool;

use crate::dto::room_dto::CatalogItemRequest;
use crate::models::catalog::{CatalogItem, CatalogTable};
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Convierte una violación de FK al borrar en `ResourceInUse`
pub(crate) fn in_use_on_fk(error: sqlx::Error, what: &str) -> AppError {
    let is_fk = matches!(
        &error,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503")
    );
    if is_fk {
        AppError::ResourceInUse(format!("{} está referenciado por otros registros", what))
    } else {
        AppError::Database(error)
    }
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, table: CatalogTable) -> AppResult<Vec<CatalogItem>> {
        let items = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT id, name, description, active, created_at FROM {} ORDER BY name",
            table.table_name()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn find_by_id(&self, table: CatalogTable, id: i32) -> AppResult<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT id, name, description, active, created_at FROM {} WHERE id = $1",
            table.table_name()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error(table.slug(), id))
    }

    /// Nombre repetido sale como 409 por el índice único
    pub async fn create(
        &self,
        table: CatalogTable,
        request: CatalogItemRequest,
    ) -> AppResult<CatalogItem> {
        let item = sqlx::query_as::<_, CatalogItem>(&format!(
            r#"
            INSERT INTO {} (name, description, active)
            VALUES ($1, $2, COALESCE($3, TRUE))
            RETURNING id, name, description, active, created_at
            "#,
            table.table_name()
        ))
        .bind(request.name.trim())
        .bind(request.description)
        .bind(request.active)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("📚 {} agregado a {}", item.name, table.slug());
        Ok(item)
    }

    pub async fn update(
        &self,
        table: CatalogTable,
        id: i32,
        request: CatalogItemRequest,
    ) -> AppResult<CatalogItem> {
        sqlx::query_as::<_, CatalogItem>(&format!(
            r#"
            UPDATE {} SET
                name = $2,
                description = $3,
                active = COALESCE($4, active)
            WHERE id = $1
            RETURNING id, name, description, active, created_at
            "#,
            table.table_name()
        ))
        .bind(id)
        .bind(request.name.trim())
        .bind(request.description)
        .bind(request.active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error(table.slug(), id))
    }

    pub async fn delete(&self, table: CatalogTable, id: i32) -> AppResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table.table_name()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| in_use_on_fk(e, table.slug()))?;

        if result.rows_affected() == 0 {
            return Err(not_found_error(table.slug(), id));
        }
        Ok(())
    }
}
