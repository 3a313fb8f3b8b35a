//! Lecturas de asignaciones: activas, detalle, viajes, historial,
//! estadísticas y contrato.
//!
//! El historial arma su `WHERE` con predicados tipados sobre
//! `sqlx::QueryBuilder`: cada filtro presente agrega una condición `AND`
//! con su parámetro ligado, nunca texto concatenado.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::dto::assignment_dto::{HistoryQuery, StatsQuery};
use crate::models::booking::BookingStatus;
use crate::models::vehicle::{Assignment, DriverLicense, TripLog, Vehicle};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub id: i32,
    pub vehicle_id: i32,
    pub plate: String,
    pub driver_id: i32,
    pub driver_name: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub destination: Option<String>,
    pub purpose: String,
    pub status: BookingStatus,
}

/// Fila del historial con la distancia del viaje, si ya se cerró
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub id: i32,
    pub vehicle_id: i32,
    pub plate: String,
    pub driver_id: i32,
    pub driver_name: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub purpose: String,
    pub status: BookingStatus,
    pub distance: Option<Decimal>,
}

#[derive(Debug, Clone, FromRow)]
struct PartyNames {
    plate: String,
    driver_name: String,
    requester_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetail {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub plate: String,
    pub driver_name: String,
    pub requester_name: String,
    pub trip: Option<TripLog>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentContract {
    pub assignment: Assignment,
    pub vehicle: Vehicle,
    pub driver_name: String,
    pub license: Option<DriverLicense>,
    pub requester_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: BookingStatus,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleUsage {
    pub vehicle_id: i32,
    pub plate: String,
    pub assignments: i64,
    pub distance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_assignments: i64,
    pub by_status: Vec<StatusCount>,
    pub total_distance: Decimal,
    pub total_fuel_cost: Decimal,
    pub top_vehicles: Vec<VehicleUsage>,
}

/// Filtro del historial; todos se combinan con `AND`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryPredicate {
    StartsOnOrAfter(NaiveDate),
    StartsOnOrBefore(NaiveDate),
    Vehicle(i32),
    Driver(i32),
    Status(BookingStatus),
}

impl HistoryPredicate {
    pub fn from_query(query: &HistoryQuery) -> Vec<Self> {
        let mut predicates = Vec::new();
        if let Some(date) = query.start_date {
            predicates.push(HistoryPredicate::StartsOnOrAfter(date));
        }
        if let Some(date) = query.end_date {
            predicates.push(HistoryPredicate::StartsOnOrBefore(date));
        }
        if let Some(id) = query.vehicle_id {
            predicates.push(HistoryPredicate::Vehicle(id));
        }
        if let Some(id) = query.driver_id {
            predicates.push(HistoryPredicate::Driver(id));
        }
        if let Some(status) = query.status {
            predicates.push(HistoryPredicate::Status(status));
        }
        predicates
    }

    fn push(self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            HistoryPredicate::StartsOnOrAfter(date) => {
                builder.push("a.start_at::DATE >= ").push_bind(date);
            }
            HistoryPredicate::StartsOnOrBefore(date) => {
                builder.push("a.start_at::DATE <= ").push_bind(date);
            }
            HistoryPredicate::Vehicle(id) => {
                builder.push("a.vehicle_id = ").push_bind(id);
            }
            HistoryPredicate::Driver(id) => {
                builder.push("a.driver_id = ").push_bind(id);
            }
            HistoryPredicate::Status(status) => {
                builder.push("a.status = ").push_bind(status);
            }
        }
    }
}

/// Construye la consulta del historial a partir de los predicados
pub fn history_query(predicates: &[HistoryPredicate]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        r#"SELECT a.id, a.vehicle_id, v.plate, a.driver_id,
       e.first_name || ' ' || e.last_name AS driver_name,
       a.start_at, a.end_at, a.purpose, a.status, t.distance
FROM vehicle_assignments a
JOIN vehicles v ON v.id = a.vehicle_id
JOIN employees e ON e.id = a.driver_id
LEFT JOIN trip_logs t ON t.assignment_id = a.id"#,
    );

    for (index, predicate) in predicates.iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        predicate.push(&mut builder);
    }
    builder.push(" ORDER BY a.start_at DESC");
    builder
}

#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Asignaciones que todavía ocupan (o van a ocupar) un vehículo
    pub async fn active(&self) -> AppResult<Vec<AssignmentSummary>> {
        let rows = sqlx::query_as::<_, AssignmentSummary>(
            r#"
            SELECT a.id, a.vehicle_id, v.plate, a.driver_id,
                   e.first_name || ' ' || e.last_name AS driver_name,
                   a.start_at, a.end_at, a.destination, a.purpose, a.status
            FROM vehicle_assignments a
            JOIN vehicles v ON v.id = a.vehicle_id
            JOIN employees e ON e.id = a.driver_id
            WHERE a.status IN ('pending', 'authorized', 'active')
            ORDER BY a.start_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find(&self, id: i32) -> AppResult<Assignment> {
        sqlx::query_as::<_, Assignment>("SELECT * FROM vehicle_assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found_error("Assignment", id))
    }

    async fn names(&self, id: i32) -> AppResult<PartyNames> {
        let names = sqlx::query_as::<_, PartyNames>(
            r#"
            SELECT v.plate,
                   d.first_name || ' ' || d.last_name AS driver_name,
                   r.first_name || ' ' || r.last_name AS requester_name
            FROM vehicle_assignments a
            JOIN vehicles v ON v.id = a.vehicle_id
            JOIN employees d ON d.id = a.driver_id
            JOIN employees r ON r.id = a.requester_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(names)
    }

    pub async fn detail(&self, id: i32) -> AppResult<AssignmentDetail> {
        let assignment = self.find(id).await?;
        let names = self.names(id).await?;
        let trip = self.trips(id).await?.into_iter().next();

        Ok(AssignmentDetail {
            assignment,
            plate: names.plate,
            driver_name: names.driver_name,
            requester_name: names.requester_name,
            trip,
        })
    }

    pub async fn trips(&self, assignment_id: i32) -> AppResult<Vec<TripLog>> {
        let trips = sqlx::query_as::<_, TripLog>(
            "SELECT * FROM trip_logs WHERE assignment_id = $1 ORDER BY departed_at",
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(trips)
    }

    pub async fn history(&self, query: &HistoryQuery) -> AppResult<Vec<HistoryRow>> {
        let predicates = HistoryPredicate::from_query(query);
        let mut builder = history_query(&predicates);
        let rows = builder
            .build_query_as::<HistoryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn stats(&self, query: &StatsQuery) -> AppResult<FleetStats> {
        let (total_assignments, total_distance): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(t.distance), 0)
            FROM vehicle_assignments a
            LEFT JOIN trip_logs t ON t.assignment_id = a.id
            WHERE ($1::INT IS NULL OR EXTRACT(MONTH FROM a.start_at)::INT = $1)
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM a.start_at)::INT = $2)
            "#,
        )
        .bind(query.month.map(|m| m as i32))
        .bind(query.year)
        .fetch_one(&self.pool)
        .await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT a.status, COUNT(*) AS total
            FROM vehicle_assignments a
            WHERE ($1::INT IS NULL OR EXTRACT(MONTH FROM a.start_at)::INT = $1)
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM a.start_at)::INT = $2)
            GROUP BY a.status
            ORDER BY a.status
            "#,
        )
        .bind(query.month.map(|m| m as i32))
        .bind(query.year)
        .fetch_all(&self.pool)
        .await?;

        let total_fuel_cost: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cost), 0)
            FROM fuel_loads
            WHERE ($1::INT IS NULL OR EXTRACT(MONTH FROM loaded_at)::INT = $1)
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM loaded_at)::INT = $2)
            "#,
        )
        .bind(query.month.map(|m| m as i32))
        .bind(query.year)
        .fetch_one(&self.pool)
        .await?;

        let top_vehicles = sqlx::query_as::<_, VehicleUsage>(
            r#"
            SELECT v.id AS vehicle_id, v.plate, COUNT(a.id) AS assignments,
                   COALESCE(SUM(t.distance), 0) AS distance
            FROM vehicle_assignments a
            JOIN vehicles v ON v.id = a.vehicle_id
            LEFT JOIN trip_logs t ON t.assignment_id = a.id
            WHERE ($1::INT IS NULL OR EXTRACT(MONTH FROM a.start_at)::INT = $1)
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM a.start_at)::INT = $2)
            GROUP BY v.id, v.plate
            ORDER BY assignments DESC, distance DESC
            LIMIT 5
            "#,
        )
        .bind(query.month.map(|m| m as i32))
        .bind(query.year)
        .fetch_all(&self.pool)
        .await?;

        Ok(FleetStats {
            total_assignments,
            by_status,
            total_distance,
            total_fuel_cost,
            top_vehicles,
        })
    }

    /// Contrato de préstamo para una asignación autorizada o en curso
    pub async fn contract(&self, id: i32) -> AppResult<AssignmentContract> {
        let assignment = self.find(id).await?;
        if !matches!(
            assignment.status,
            BookingStatus::Authorized | BookingStatus::Active
        ) {
            return Err(AppError::InvalidState(format!(
                "La asignación {} está en estado {}; el contrato requiere autorización",
                id, assignment.status
            )));
        }

        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(assignment.vehicle_id)
            .fetch_one(&self.pool)
            .await?;
        let license = sqlx::query_as::<_, DriverLicense>(
            r#"
            SELECT * FROM driver_licenses
            WHERE employee_id = $1 AND status = 'active'
            ORDER BY expires_on DESC
            LIMIT 1
            "#,
        )
        .bind(assignment.driver_id)
        .fetch_optional(&self.pool)
        .await?;
        let names = self.names(id).await?;

        Ok(AssignmentContract {
            assignment,
            vehicle,
            driver_name: names.driver_name,
            license,
            requester_name: names.requester_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_means_no_where_clause() {
        let builder = history_query(&[]);
        assert!(!builder.sql().contains("WHERE"));
        assert!(builder.sql().ends_with("ORDER BY a.start_at DESC"));
    }

    #[test]
    fn filters_are_and_combined_with_bound_parameters() {
        let query = HistoryQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: None,
            vehicle_id: Some(3),
            driver_id: Some(5),
            status: None,
        };
        let predicates = HistoryPredicate::from_query(&query);
        assert_eq!(predicates.len(), 3);

        let builder = history_query(&predicates);
        let sql = builder.sql();
        assert!(sql.contains(
            "WHERE a.start_at::DATE >= $1 AND a.vehicle_id = $2 AND a.driver_id = $3"
        ));
        assert!(!sql.contains("2024"));
    }

    #[test]
    fn status_filter_binds_enum() {
        let builder = history_query(&[HistoryPredicate::Status(BookingStatus::Finalized)]);
        assert!(builder.sql().contains("WHERE a.status = $1"));
    }
}
