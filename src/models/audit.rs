//! Registro de auditoría de cambios sobre reservas existentes.
//! Las filas sólo se insertan; nunca se actualizan ni se borran.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, Serialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "audited_entity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditedEntity {
    Assignment,
    Reservation,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: i32,
    pub entity: AuditedEntity,
    pub entity_id: i32,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: Option<String>,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    pub entity: AuditedEntity,
    pub entity_id: i32,
    pub field: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: Option<String>,
    pub actor: String,
}

/// Compara los campos protegidos y produce una fila por cada campo que cambió
pub struct AuditDiff {
    entity: AuditedEntity,
    entity_id: i32,
    actor: String,
    records: Vec<NewAuditRecord>,
}

impl AuditDiff {
    pub fn new(entity: AuditedEntity, entity_id: i32, actor: &str) -> Self {
        Self {
            entity,
            entity_id,
            actor: actor.to_string(),
            records: Vec::new(),
        }
    }

    pub fn field<T: PartialEq + ToString>(
        mut self,
        field: &'static str,
        old: &T,
        new: &T,
        reason: Option<&str>,
    ) -> Self {
        if old != new {
            self.records.push(NewAuditRecord {
                entity: self.entity,
                entity_id: self.entity_id,
                field,
                old_value: Some(old.to_string()),
                new_value: Some(new.to_string()),
                reason: reason.map(str::to_string),
                actor: self.actor.clone(),
            });
        }
        self
    }

    pub fn into_records(self) -> Vec<NewAuditRecord> {
        self.records
    }
}
