use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::booking::BookingStatus;
use crate::models::vehicle::{Assignment, TripLog};

// Request para crear una asignación
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    #[validate(range(min = 1))]
    pub vehicle_id: i32,

    #[validate(range(min = 1))]
    pub driver_id: i32,

    #[validate(range(min = 1))]
    pub requester_id: i32,

    pub assignment_type_id: Option<i32>,

    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,

    #[validate(length(max = 255))]
    pub destination: Option<String>,

    #[validate(
        length(min = 3, max = 500),
        custom = "crate::utils::validation::validate_not_blank"
    )]
    pub purpose: String,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub start_odometer: Option<Decimal>,

    #[validate(length(max = 20))]
    pub start_fuel_level: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    /// Crea la asignación en pendiente en lugar de activarla
    #[serde(default)]
    pub requires_approval: bool,
}

// Request para editar una asignación pendiente o autorizada
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    #[validate(range(min = 1))]
    pub driver_id: i32,

    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,

    #[validate(length(max = 255))]
    pub destination: Option<String>,

    #[validate(
        length(min = 3, max = 500),
        custom = "crate::utils::validation::validate_not_blank"
    )]
    pub purpose: String,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    #[validate(length(max = 500))]
    pub change_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivateAssignmentRequest {
    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub start_odometer: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeAssignmentRequest {
    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub end_odometer: Decimal,

    #[validate(length(max = 20))]
    pub end_fuel_level: Option<String>,

    pub returned_at: Option<NaiveDateTime>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Filtros del historial; todos opcionales y combinados con AND
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub vehicle_id: Option<i32>,
    pub driver_id: Option<i32>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StatsQuery {
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,

    #[validate(range(min = 2000, max = 2100))]
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCreated {
    pub id: i32,
    pub status: BookingStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFinalized {
    pub assignment: Assignment,
    pub trip: Option<TripLog>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_defaults_to_immediate_activation() {
        let request: CreateAssignmentRequest = serde_json::from_value(json!({
            "vehicleId": 1,
            "driverId": 5,
            "requesterId": 9,
            "startAt": "2024-06-01T08:00:00",
            "endAt": "2024-06-01T17:00:00",
            "purpose": "Entrega de materiales"
        }))
        .unwrap();

        assert!(!request.requires_approval);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn negative_odometer_is_rejected() {
        let request: FinalizeAssignmentRequest =
            serde_json::from_value(json!({"endOdometer": "-3"})).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn stats_month_is_bounded() {
        let query = StatsQuery {
            month: Some(13),
            year: None,
        };
        assert!(query.validate().is_err());
    }
}
