use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::vehicle::{LicenseStatus, VehicleStatus};

// Request para crear un vehículo
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[validate(range(min = 1))]
    pub vehicle_type_id: i32,

    #[validate(length(min = 5, max = 20))]
    pub plate: String,

    #[validate(length(min = 2, max = 100))]
    pub brand: String,

    #[validate(length(min = 1, max = 100))]
    pub model: String,

    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,

    #[validate(length(max = 50))]
    pub color: Option<String>,

    #[validate(length(max = 50))]
    pub chassis_number: Option<String>,

    #[validate(length(max = 50))]
    pub engine_number: Option<String>,

    #[validate(length(max = 50))]
    pub registration_card: Option<String>,
    pub registration_expires_on: Option<NaiveDate>,

    #[validate(length(max = 50))]
    pub insurance_policy: Option<String>,
    pub insurance_expires_on: Option<NaiveDate>,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub current_odometer: Option<Decimal>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

// Request para actualizar un vehículo; los campos ausentes no cambian
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    #[validate(range(min = 1))]
    pub vehicle_type_id: Option<i32>,

    #[validate(length(min = 5, max = 20))]
    pub plate: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub brand: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,

    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,

    #[validate(length(max = 50))]
    pub color: Option<String>,

    pub registration_expires_on: Option<NaiveDate>,
    pub insurance_expires_on: Option<NaiveDate>,

    #[validate(length(max = 50))]
    pub insurance_policy: Option<String>,

    /// Sólo Available o Maintenance; InUse e Inactive los gestiona el ciclo de vida
    pub status: Option<VehicleStatus>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFilters {
    pub status: Option<VehicleStatus>,
    pub vehicle_type_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseRequest {
    #[validate(range(min = 1))]
    pub employee_id: i32,

    #[validate(length(min = 3, max = 50))]
    pub license_number: String,

    #[validate(length(min = 1, max = 10))]
    pub license_type: String,

    pub issued_on: NaiveDate,
    pub expires_on: NaiveDate,

    #[validate(length(max = 255))]
    pub restrictions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLicenseRequest {
    #[validate(length(min = 3, max = 50))]
    pub license_number: Option<String>,

    #[validate(length(min = 1, max = 10))]
    pub license_type: Option<String>,

    pub issued_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
    pub status: Option<LicenseStatus>,

    #[validate(length(max = 255))]
    pub restrictions: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    #[validate(range(min = 1))]
    pub maintenance_type_id: i32,

    #[validate(length(min = 3, max = 500))]
    pub description: String,

    pub performed_on: NaiveDate,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub odometer: Decimal,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub cost: Decimal,

    #[validate(length(max = 150))]
    pub provider: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFuelLoadRequest {
    pub assignment_id: Option<i32>,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub liters: Decimal,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub total_cost: Decimal,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub odometer: Decimal,

    #[validate(length(max = 150))]
    pub station: Option<String>,

    #[validate(length(max = 50))]
    pub invoice_number: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}
