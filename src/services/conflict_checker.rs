//! Detección de traslapes
//!
//! Consulta, dentro de la transacción en curso, las reservas no terminales
//! de un recurso cuya ventana se cruza con la solicitada. Es de sólo
//! lectura; el llamador decide si el resultado aborta la operación.

use chrono::NaiveDate;
use serde::Serialize;

use crate::database::store::{FleetTx, ReservationTx};
use crate::models::booking::{ConflictingBooking, TimeWindow};
use crate::utils::errors::{AppError, AppResult};

/// Resultado de un chequeo de conflictos
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub is_conflict: bool,
    pub conflicts: Vec<ConflictingBooking>,
}

impl ConflictReport {
    fn new(conflicts: Vec<ConflictingBooking>) -> Self {
        Self {
            is_conflict: !conflicts.is_empty(),
            conflicts,
        }
    }

    /// Convierte un reporte con conflictos en `AppError::Conflict`
    pub fn into_result(self, message: impl Into<String>) -> AppResult<()> {
        if self.is_conflict {
            return Err(AppError::Conflict {
                message: message.into(),
                conflicts: self.conflicts,
            });
        }
        Ok(())
    }
}

pub async fn check_vehicle<T: FleetTx>(
    tx: &mut T,
    vehicle_id: i32,
    window: &TimeWindow,
    exclude: Option<i32>,
) -> AppResult<ConflictReport> {
    let conflicts = tx.assignment_conflicts(vehicle_id, window, exclude).await?;
    Ok(ConflictReport::new(conflicts))
}

pub async fn check_room<T: ReservationTx>(
    tx: &mut T,
    room_id: i32,
    date: NaiveDate,
    window: &TimeWindow,
    exclude: Option<i32>,
) -> AppResult<ConflictReport> {
    let conflicts = tx
        .reservation_conflicts(room_id, date, window, exclude)
        .await?;
    Ok(ConflictReport::new(conflicts))
}

/// Falla con `Conflict` si el vehículo ya está comprometido en la ventana
pub async fn ensure_vehicle_free<T: FleetTx>(
    tx: &mut T,
    vehicle_id: i32,
    window: &TimeWindow,
    exclude: Option<i32>,
) -> AppResult<()> {
    let report = check_vehicle(tx, vehicle_id, window, exclude).await?;
    if report.is_conflict {
        tracing::warn!(
            "⛔ Vehículo {} ocupado: {} asignación(es) en conflicto",
            vehicle_id,
            report.conflicts.len()
        );
    }
    report.into_result("El vehículo ya tiene una asignación en ese horario")
}

/// Falla con `Conflict` si el salón ya está reservado en la ventana
pub async fn ensure_room_free<T: ReservationTx>(
    tx: &mut T,
    room_id: i32,
    date: NaiveDate,
    window: &TimeWindow,
    exclude: Option<i32>,
) -> AppResult<()> {
    let report = check_room(tx, room_id, date, window, exclude).await?;
    if report.is_conflict {
        tracing::warn!(
            "⛔ Salón {} ocupado el {}: {} reserva(s) en conflicto",
            room_id,
            date,
            report.conflicts.len()
        );
    }
    report.into_result("El salón ya está reservado en ese horario")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::store::{Store, StoreTx};
    use crate::models::booking::BookingStatus;
    use crate::models::reservation::{NewReservation, RequesterType};
    use crate::models::vehicle::NewAssignment;
    use chrono::{NaiveDateTime, NaiveTime};
    use rust_decimal::Decimal;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn assignment(vehicle_id: i32, window: TimeWindow, status: BookingStatus) -> NewAssignment {
        NewAssignment {
            vehicle_id,
            driver_id: 5,
            requester_id: 9,
            assignment_type_id: None,
            window,
            destination: None,
            purpose: "Visita de campo".to_string(),
            start_odometer: Decimal::from(100),
            start_fuel_level: None,
            notes: None,
            status,
            created_by: "test".to_string(),
        }
    }

    fn reservation(room_id: i32, date: NaiveDate, start: u32, end: u32) -> NewReservation {
        NewReservation {
            room_id,
            capacity_id: None,
            room_note: None,
            requester_type: RequesterType::Internal,
            employee_id: Some(1),
            external_requester_id: None,
            event_name: "Reservation A".to_string(),
            event_date: date,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            attendees: 20,
            requires_tasting: false,
            notes: None,
            created_by: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn vehicle_conflicts_ignore_terminal_and_excluded_bookings() {
        let store = MemoryStore::new();
        let vehicle = store.add_vehicle("P-123ABC", Decimal::from(100));
        let mut tx = store.begin().await.unwrap();

        let window = TimeWindow::closed(at(1, 8), at(1, 17)).unwrap();
        let active = tx
            .insert_assignment(&assignment(vehicle, window, BookingStatus::Active))
            .await
            .unwrap();
        tx.insert_assignment(&assignment(vehicle, window, BookingStatus::Cancelled))
            .await
            .unwrap();

        let candidate = TimeWindow::closed(at(1, 12), at(1, 13)).unwrap();
        let report = check_vehicle(&mut tx, vehicle, &candidate, None).await.unwrap();
        assert!(report.is_conflict);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].id, active);
        assert_eq!(report.conflicts[0].resource_name, "P-123ABC");

        let report = check_vehicle(&mut tx, vehicle, &candidate, Some(active)).await.unwrap();
        assert!(!report.is_conflict);
    }

    #[tokio::test]
    async fn open_ended_assignment_blocks_later_windows() {
        let store = MemoryStore::new();
        let vehicle = store.add_vehicle("P-999XYZ", Decimal::ZERO);
        let mut tx = store.begin().await.unwrap();

        tx.insert_assignment(&assignment(
            vehicle,
            TimeWindow::open(at(3, 8)),
            BookingStatus::Active,
        ))
        .await
        .unwrap();

        let next_week = TimeWindow::closed(at(10, 8), at(10, 12)).unwrap();
        let earlier = TimeWindow::closed(at(2, 8), at(3, 8)).unwrap();

        assert!(check_vehicle(&mut tx, vehicle, &next_week, None).await.unwrap().is_conflict);
        assert!(!check_vehicle(&mut tx, vehicle, &earlier, None).await.unwrap().is_conflict);
    }

    #[tokio::test]
    async fn room_boundary_touch_is_not_a_conflict() {
        let store = MemoryStore::new();
        let room = store.add_room("Salón Jade");
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_reservation(&reservation(room, date, 8, 10)).await.unwrap();

        let after = TimeWindow::on_date(
            date,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        )
        .unwrap();
        let report = check_room(&mut tx, room, date, &after, None).await.unwrap();
        assert!(!report.is_conflict);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn room_conflict_surfaces_as_conflict_error() {
        let store = MemoryStore::new();
        let room = store.add_room("Salón Jade");
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut tx = store.begin().await.unwrap();
        let existing = tx.insert_reservation(&reservation(room, date, 14, 16)).await.unwrap();

        let candidate = TimeWindow::on_date(
            date,
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .unwrap();

        match ensure_room_free(&mut tx, room, date, &candidate, None).await {
            Err(AppError::Conflict { conflicts, .. }) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, existing);
                assert_eq!(conflicts[0].title, "Reservation A");
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        let other_day = date.succ_opt().unwrap();
        let shifted = TimeWindow::on_date(
            other_day,
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(ensure_room_free(&mut tx, room, other_day, &shifted, None).await.is_ok());
    }
}
