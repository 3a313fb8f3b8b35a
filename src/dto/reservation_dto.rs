use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::booking::BookingStatus;
use crate::models::reservation::{DetailWarning, Payment, RequesterType};
use crate::utils::validation::{deserialize_optional_time, deserialize_time, parse_catalog_id};

/// Item de detalle tal como llega del cliente: id suelto o `{id, note}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DetailItem {
    WithNote {
        id: serde_json::Value,
        #[serde(default)]
        note: Option<String>,
    },
    Bare(serde_json::Value),
}

impl DetailItem {
    pub fn id(&self) -> Option<i32> {
        match self {
            DetailItem::WithNote { id, .. } | DetailItem::Bare(id) => parse_catalog_id(id),
        }
    }

    pub fn note(&self) -> Option<String> {
        match self {
            DetailItem::WithNote { note, .. } => note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            DetailItem::Bare(_) => None,
        }
    }

    /// Representación original, usada en los avisos
    pub fn raw(&self) -> String {
        match self {
            DetailItem::WithNote { id, .. } | DetailItem::Bare(id) => match id {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRequesterInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 3, max = 150))]
    pub full_name: String,

    #[validate(length(min = 2, max = 150))]
    pub company: String,

    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

// Request para crear o editar una reserva de salón
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    #[validate(range(min = 1))]
    pub room_id: i32,

    pub capacity_id: Option<i32>,

    #[validate(length(max = 500))]
    pub room_note: Option<String>,

    pub requester_type: RequesterType,
    pub employee_id: Option<i32>,

    #[validate]
    pub external: Option<ExternalRequesterInput>,

    #[validate(
        length(min = 3, max = 200),
        custom = "crate::utils::validation::validate_not_blank"
    )]
    pub event_name: String,

    pub event_date: NaiveDate,

    #[serde(deserialize_with = "deserialize_time")]
    pub start_time: NaiveTime,

    #[serde(deserialize_with = "deserialize_time")]
    pub end_time: NaiveTime,

    #[validate(range(min = 1, max = 10000))]
    pub attendees: i32,

    #[serde(default)]
    pub requires_tasting: bool,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    #[serde(default)]
    pub services: Vec<DetailItem>,

    #[serde(default)]
    pub equipment: Vec<DetailItem>,

    #[serde(default)]
    pub tastings: Vec<DetailItem>,

    /// Motivo registrado en la auditoría al editar
    #[validate(length(max = 500))]
    pub change_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatusChangeRequest {
    pub status: BookingStatus,

    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[validate(range(min = 1))]
    pub payment_type_id: i32,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub total: Decimal,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub advance: Decimal,

    #[validate(length(max = 50))]
    pub receipt_number: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Consulta de disponibilidad; sin `endTime` se evalúa el instante de inicio
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapQuery {
    pub room_id: i32,
    pub date: NaiveDate,

    #[serde(deserialize_with = "deserialize_time")]
    pub start_time: NaiveTime,

    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub end_time: Option<NaiveTime>,

    pub exclude_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationFilters {
    pub status: Option<BookingStatus>,
    pub room_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RequesterSearchQuery {
    #[validate(custom = "crate::utils::validation::validate_search_term")]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSaved {
    pub id: i32,
    pub status: BookingStatus,
    pub warnings: Vec<DetailWarning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRegistered {
    pub payment: Payment,
    pub status: BookingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_items_accept_bare_ids_and_objects() {
        let items: Vec<DetailItem> =
            serde_json::from_value(json!([3, "7", {"id": 9, "note": " sin gluten "}, "x1"]))
                .unwrap();

        assert_eq!(items[0].id(), Some(3));
        assert_eq!(items[1].id(), Some(7));
        assert_eq!(items[2].id(), Some(9));
        assert_eq!(items[2].note().as_deref(), Some("sin gluten"));
        assert_eq!(items[3].id(), None);
        assert_eq!(items[3].raw(), "x1");
    }

    #[test]
    fn reservation_times_are_normalized() {
        let request: ReservationRequest = serde_json::from_value(json!({
            "roomId": 2,
            "requesterType": "internal",
            "employeeId": 4,
            "eventName": "Capacitación anual",
            "eventDate": "2024-07-01",
            "startTime": "14:00",
            "endTime": "16:30:00",
            "attendees": 40
        }))
        .unwrap();

        assert_eq!(request.start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(request.end_time, NaiveTime::from_hms_opt(16, 30, 0).unwrap());
        assert!(request.services.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn external_email_is_validated() {
        let request: ReservationRequest = serde_json::from_value(json!({
            "roomId": 2,
            "requesterType": "external",
            "external": {"email": "no-es-email", "fullName": "Ana Pérez", "company": "ACME"},
            "eventName": "Lanzamiento",
            "eventDate": "2024-07-01",
            "startTime": "09:00",
            "endTime": "10:00",
            "attendees": 10
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
