use sqlx::PgPool;

use crate::models::audit::{AuditRecord, AuditedEntity};
use crate::utils::errors::AppResult;

/// Lectura del historial de cambios; la escritura ocurre dentro de las transacciones de reserva
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn trail(&self, entity: AuditedEntity, entity_id: i32) -> AppResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, entity, entity_id, field, old_value, new_value, reason, actor, changed_at
            FROM audit_log
            WHERE entity = $1 AND entity_id = $2
            ORDER BY changed_at DESC, id DESC
            "#,
        )
        .bind(entity)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
