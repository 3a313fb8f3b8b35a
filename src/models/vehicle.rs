//! Modelos de flota
//!
//! Vehículos, licencias de conductores, asignaciones y los registros
//! derivados de ellas (viajes, mantenimientos, cargas de combustible).
//! Mapean a las tablas del schema PostgreSQL en `migrations/`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::booking::{BookingStatus, TimeWindow};

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    Maintenance,
    Inactive,
}

impl VehicleStatus {
    /// Un vehículo en mantenimiento o dado de baja no acepta asignaciones nuevas
    pub fn accepts_bookings(self) -> bool {
        matches!(self, VehicleStatus::Available | VehicleStatus::InUse)
    }
}

/// Estado de una licencia - mapea al ENUM license_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "license_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i32,
    pub vehicle_type_id: i32,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub chassis_number: Option<String>,
    pub engine_number: Option<String>,
    pub registration_card: Option<String>,
    pub registration_expires_on: Option<NaiveDate>,
    pub insurance_policy: Option<String>,
    pub insurance_expires_on: Option<NaiveDate>,
    pub current_odometer: Decimal,
    pub status: VehicleStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverLicense {
    pub id: i32,
    pub employee_id: i32,
    pub license_number: String,
    pub license_type: String,
    pub issued_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub status: LicenseStatus,
    pub restrictions: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl DriverLicense {
    /// Vigente: activa y con caducidad posterior a `today`
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        self.status == LicenseStatus::Active && self.expires_on > today
    }
}

/// Asignación de un vehículo a un conductor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i32,
    pub vehicle_id: i32,
    pub driver_id: i32,
    pub requester_id: i32,
    pub assignment_type_id: Option<i32>,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub destination: Option<String>,
    pub purpose: String,
    pub start_odometer: Decimal,
    pub start_fuel_level: Option<String>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_at,
            end: self.end_at,
        }
    }
}

/// Datos para insertar una asignación
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub vehicle_id: i32,
    pub driver_id: i32,
    pub requester_id: i32,
    pub assignment_type_id: Option<i32>,
    pub window: TimeWindow,
    pub destination: Option<String>,
    pub purpose: String,
    pub start_odometer: Decimal,
    pub start_fuel_level: Option<String>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_by: String,
}

/// Cambios editables de una asignación no terminal
#[derive(Debug, Clone)]
pub struct AssignmentChanges {
    pub driver_id: i32,
    pub window: TimeWindow,
    pub destination: Option<String>,
    pub purpose: String,
    pub notes: Option<String>,
}

/// Registro de viaje materializado al finalizar una asignación
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripLog {
    pub id: i32,
    pub assignment_id: i32,
    pub departed_at: NaiveDateTime,
    pub returned_at: NaiveDateTime,
    pub start_odometer: Decimal,
    pub end_odometer: Decimal,
    pub distance: Decimal,
    pub start_fuel_level: Option<String>,
    pub end_fuel_level: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTripLog {
    pub assignment_id: i32,
    pub departed_at: NaiveDateTime,
    pub returned_at: NaiveDateTime,
    pub start_odometer: Decimal,
    pub end_odometer: Decimal,
    pub start_fuel_level: Option<String>,
    pub end_fuel_level: Option<String>,
    pub notes: Option<String>,
}

impl NewTripLog {
    pub fn distance(&self) -> Decimal {
        self.end_odometer - self.start_odometer
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub id: i32,
    pub vehicle_id: i32,
    pub maintenance_type_id: i32,
    pub maintenance_type: String,
    pub description: String,
    pub performed_on: NaiveDate,
    pub odometer: Decimal,
    pub cost: Decimal,
    pub provider: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FuelLoad {
    pub id: i32,
    pub vehicle_id: i32,
    pub assignment_id: Option<i32>,
    pub liters: Decimal,
    pub total_cost: Decimal,
    pub odometer: Decimal,
    pub station: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub loaded_at: DateTime<Utc>,
}
