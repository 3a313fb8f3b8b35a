//! Catálogos simples (id, nombre, descripción, activo)
//!
//! Todos comparten la misma forma de tabla, así que un único repositorio
//! los atiende. El nombre de tabla sale siempre de `CatalogTable`, nunca
//! de la entrada del usuario.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use super::auth::Module;
use super::reservation::DetailKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    VehicleTypes,
    AssignmentTypes,
    MaintenanceTypes,
    Services,
    Equipment,
    Tastings,
    SetupTypes,
    CostTypes,
    PaymentTypes,
}

impl CatalogTable {
    pub const ALL: [CatalogTable; 9] = [
        CatalogTable::VehicleTypes,
        CatalogTable::AssignmentTypes,
        CatalogTable::MaintenanceTypes,
        CatalogTable::Services,
        CatalogTable::Equipment,
        CatalogTable::Tastings,
        CatalogTable::SetupTypes,
        CatalogTable::CostTypes,
        CatalogTable::PaymentTypes,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            CatalogTable::VehicleTypes => "vehicle_types",
            CatalogTable::AssignmentTypes => "assignment_types",
            CatalogTable::MaintenanceTypes => "maintenance_types",
            CatalogTable::Services => "services",
            CatalogTable::Equipment => "equipment",
            CatalogTable::Tastings => "tastings",
            CatalogTable::SetupTypes => "setup_types",
            CatalogTable::CostTypes => "cost_types",
            CatalogTable::PaymentTypes => "payment_types",
        }
    }

    /// Segmento de URL con el que se expone el catálogo
    pub fn slug(self) -> &'static str {
        match self {
            CatalogTable::VehicleTypes => "vehicle-types",
            CatalogTable::AssignmentTypes => "assignment-types",
            CatalogTable::MaintenanceTypes => "maintenance-types",
            CatalogTable::Services => "services",
            CatalogTable::Equipment => "equipment",
            CatalogTable::Tastings => "tastings",
            CatalogTable::SetupTypes => "setup-types",
            CatalogTable::CostTypes => "cost-types",
            CatalogTable::PaymentTypes => "payment-types",
        }
    }
}

impl CatalogTable {
    /// Módulo que administra el catálogo; la lectura es libre para cualquier sesión
    pub fn owner(self) -> Module {
        match self {
            CatalogTable::VehicleTypes
            | CatalogTable::AssignmentTypes
            | CatalogTable::MaintenanceTypes => Module::Fleet,
            CatalogTable::PaymentTypes => Module::Reservations,
            _ => Module::Rooms,
        }
    }
}

impl FromStr for CatalogTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CatalogTable::ALL
            .into_iter()
            .find(|table| table.slug() == s)
            .ok_or_else(|| format!("Unknown catalog '{}'", s))
    }
}

impl From<DetailKind> for CatalogTable {
    fn from(kind: DetailKind) -> Self {
        match kind {
            DetailKind::Service => CatalogTable::Services,
            DetailKind::Equipment => CatalogTable::Equipment,
            DetailKind::Tasting => CatalogTable::Tastings,
        }
    }
}

/// Tipo de mantenimiento que deja el vehículo fuera de servicio
pub const MAINTENANCE_TYPE_CORRECTIVE: i32 = 2;
