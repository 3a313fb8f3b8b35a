//! Modelos de reservas de salones
//!
//! Solicitudes de reserva, solicitantes externos, selecciones de
//! servicios/equipo/degustaciones y pagos.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;

use super::booking::{BookingStatus, TimeWindow};

/// Tipo de solicitante - mapea al ENUM requester_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "requester_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequesterType {
    Internal,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i32,
    pub room_id: i32,
    pub capacity_id: Option<i32>,
    pub room_note: Option<String>,
    pub requester_type: RequesterType,
    pub employee_id: Option<i32>,
    pub external_requester_id: Option<i32>,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attendees: i32,
    pub requires_tasting: bool,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn window(&self) -> Option<TimeWindow> {
        TimeWindow::on_date(self.event_date, self.start_time, self.end_time)
    }
}

/// Datos de una reserva listos para insertar o reemplazar
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub room_id: i32,
    pub capacity_id: Option<i32>,
    pub room_note: Option<String>,
    pub requester_type: RequesterType,
    pub employee_id: Option<i32>,
    pub external_requester_id: Option<i32>,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attendees: i32,
    pub requires_tasting: bool,
    pub notes: Option<String>,
    pub created_by: String,
}

/// Solicitante externo, identificado por email
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRequester {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub company: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExternalRequester {
    pub email: String,
    pub full_name: String,
    pub company: String,
    pub phone: Option<String>,
}

/// Catálogo al que apunta una fila de detalle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "detail_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    Service,
    Equipment,
    Tasting,
}

impl fmt::Display for DetailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetailKind::Service => "service",
            DetailKind::Equipment => "equipment",
            DetailKind::Tasting => "tasting",
        };
        f.write_str(name)
    }
}

/// Selección ya resuelta contra su catálogo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DetailSelection {
    pub kind: DetailKind,
    pub item_id: i32,
    pub note: Option<String>,
}

/// Aviso por un detalle omitido durante la creación o edición
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailWarning {
    pub kind: DetailKind,
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i32,
    pub reservation_id: i32,
    pub payment_type_id: i32,
    pub total: Decimal,
    pub advance: Decimal,
    pub balance: Decimal,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub reservation_id: i32,
    pub payment_type_id: i32,
    pub total: Decimal,
    pub advance: Decimal,
    pub receipt_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl NewPayment {
    pub fn balance(&self) -> Decimal {
        self.total - self.advance
    }
}
