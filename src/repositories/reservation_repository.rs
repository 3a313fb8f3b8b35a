//! Lecturas de reservas: listados, detalle, calendario y contrato
//!
//! Las escrituras pasan por `ReservationService` sobre el adaptador
//! transaccional; aquí sólo hay consultas sobre el pool.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::dto::reservation_dto::ReservationFilters;
use crate::models::booking::BookingStatus;
use crate::models::reservation::{
    DetailKind, ExternalRequester, Payment, RequesterType, Reservation,
};
use crate::models::room::{COST_TYPE_BASE_PRICE, COST_TYPE_DEPOSIT};
use crate::services::calendar::CalendarRow;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub id: i32,
    pub room_id: i32,
    pub room_name: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attendees: i32,
    pub requester_type: RequesterType,
    pub requester_name: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Fila de detalle con el nombre del elemento de catálogo
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DetailRow {
    pub kind: DetailKind,
    pub item_id: i32,
    pub name: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct RequesterInfo {
    room_name: String,
    requester_name: Option<String>,
    requester_email: Option<String>,
    requester_company: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub room_name: String,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub requester_company: Option<String>,
    pub details: Vec<DetailRow>,
    pub payment: Option<Payment>,
}

/// Datos que el frontend necesita para generar el contrato
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationContract {
    #[serde(flatten)]
    pub detail: ReservationDetail,
    pub base_price: Option<Decimal>,
    pub deposit: Option<Decimal>,
}

const REQUESTER_NAME: &str = "COALESCE(e.first_name || ' ' || e.last_name, x.full_name)";

#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filters: &ReservationFilters) -> AppResult<Vec<ReservationSummary>> {
        let rows = sqlx::query_as::<_, ReservationSummary>(&format!(
            r#"
            SELECT r.id, r.room_id, s.name AS room_name, r.event_name, r.event_date,
                   r.start_time, r.end_time, r.attendees, r.requester_type,
                   {} AS requester_name, r.status, r.created_at
            FROM reservations r
            JOIN rooms s ON s.id = r.room_id
            LEFT JOIN employees e ON e.id = r.employee_id
            LEFT JOIN external_requesters x ON x.id = r.external_requester_id
            WHERE ($1::booking_status IS NULL OR r.status = $1)
              AND ($2::INT IS NULL OR r.room_id = $2)
              AND ($3::DATE IS NULL OR r.event_date >= $3)
              AND ($4::DATE IS NULL OR r.event_date <= $4)
            ORDER BY r.event_date DESC, r.start_time
            "#,
            REQUESTER_NAME
        ))
        .bind(filters.status)
        .bind(filters.room_id)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn detail(&self, id: i32) -> AppResult<ReservationDetail> {
        let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found_error("Reservation", id))?;

        let info = sqlx::query_as::<_, RequesterInfo>(&format!(
            r#"
            SELECT s.name AS room_name, {} AS requester_name,
                   COALESCE(e.email, x.email) AS requester_email,
                   x.company AS requester_company
            FROM reservations r
            JOIN rooms s ON s.id = r.room_id
            LEFT JOIN employees e ON e.id = r.employee_id
            LEFT JOIN external_requesters x ON x.id = r.external_requester_id
            WHERE r.id = $1
            "#,
            REQUESTER_NAME
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let details = sqlx::query_as::<_, DetailRow>(
            r#"
            SELECT d.kind, d.item_id, COALESCE(s.name, e.name, t.name) AS name, d.note
            FROM reservation_details d
            LEFT JOIN services s ON d.kind = 'service' AND s.id = d.item_id
            LEFT JOIN equipment e ON d.kind = 'equipment' AND e.id = d.item_id
            LEFT JOIN tastings t ON d.kind = 'tasting' AND t.id = d.item_id
            WHERE d.reservation_id = $1
            ORDER BY d.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let payment = self.payment(id).await?;

        Ok(ReservationDetail {
            reservation,
            room_name: info.room_name,
            requester_name: info.requester_name,
            requester_email: info.requester_email,
            requester_company: info.requester_company,
            details,
            payment,
        })
    }

    pub async fn payment(&self, reservation_id: i32) -> AppResult<Option<Payment>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reservation_id = $1")
                .bind(reservation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(payment)
    }

    /// Reservas no terminales para el calendario
    pub async fn calendar_rows(&self) -> AppResult<Vec<CalendarRow>> {
        let rows = sqlx::query_as::<_, CalendarRow>(
            r#"
            SELECT r.id, r.event_name, s.name AS room_name, r.event_date,
                   r.start_time, r.end_time, r.status
            FROM reservations r
            JOIN rooms s ON s.id = r.room_id
            WHERE r.status IN ('pending', 'authorized', 'active')
            ORDER BY r.event_date, r.start_time
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn search_requesters(&self, term: &str) -> AppResult<Vec<ExternalRequester>> {
        let pattern = format!("%{}%", term.trim());
        let rows = sqlx::query_as::<_, ExternalRequester>(
            r#"
            SELECT * FROM external_requesters
            WHERE email ILIKE $1 OR full_name ILIKE $1 OR company ILIKE $1
            ORDER BY full_name
            LIMIT 20
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Contrato de una reserva ya autorizada
    pub async fn contract(&self, id: i32) -> AppResult<ReservationContract> {
        let detail = self.detail(id).await?;
        let status = detail.reservation.status;
        if !matches!(
            status,
            BookingStatus::Authorized | BookingStatus::Active | BookingStatus::Finalized
        ) {
            return Err(AppError::InvalidState(format!(
                "La reserva {} está en estado {}; el contrato requiere pago registrado",
                id, status
            )));
        }

        let costs: Vec<(i32, Decimal)> = sqlx::query_as(
            "SELECT cost_type_id, amount FROM room_costs WHERE room_id = $1 AND active",
        )
        .bind(detail.reservation.room_id)
        .fetch_all(&self.pool)
        .await?;
        let amount_of = |cost_type: i32| {
            costs
                .iter()
                .find(|(type_id, _)| *type_id == cost_type)
                .map(|(_, amount)| *amount)
        };

        Ok(ReservationContract {
            base_price: amount_of(COST_TYPE_BASE_PRICE),
            deposit: amount_of(COST_TYPE_DEPOSIT),
            detail,
        })
    }
}
