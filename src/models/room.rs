//! Modelos de salones
//!
//! Salones, capacidades por tipo de montaje y costos por salón.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub max_capacity: i32,
    pub active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Capacidad de un salón para un tipo de montaje
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomCapacity {
    pub id: i32,
    pub room_id: i32,
    pub setup_type_id: i32,
    pub setup_type: String,
    pub capacity: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomCost {
    pub id: i32,
    pub room_id: i32,
    pub cost_type_id: i32,
    pub cost_type: String,
    pub amount: Decimal,
    pub active: bool,
}

/// Tipo de costo con significado para los contratos
pub const COST_TYPE_BASE_PRICE: i32 = 1;
pub const COST_TYPE_DEPOSIT: i32 = 2;
