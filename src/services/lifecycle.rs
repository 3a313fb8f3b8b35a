//! Ciclo de vida de reservas
//!
//! Tabla de transiciones legales y los efectos laterales de cada una sobre
//! el recurso (vehículo o salón). Las funciones `transition_*` corren
//! dentro de una transacción abierta; el commit lo decide el llamador.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::database::store::{FleetTx, ReservationTx};
use crate::models::booking::BookingStatus;
use crate::models::reservation::Reservation;
use crate::models::vehicle::{Assignment, DriverLicense, NewTripLog, TripLog, VehicleStatus};
use crate::services::conflict_checker::{ensure_room_free, ensure_vehicle_free};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

use BookingStatus::*;

/// Quién ejecuta la transición y cuándo
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub actor: String,
    pub now: DateTime<Utc>,
}

impl TransitionContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            now: Utc::now(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Destinos legales desde `from`. Los estados terminales no tienen salida.
pub fn allowed_targets(from: BookingStatus) -> &'static [BookingStatus] {
    match from {
        Pending => &[Authorized, Cancelled],
        Authorized => &[Active, Finalized, Cancelled],
        Active => &[Finalized, Cancelled],
        Finalized | Cancelled => &[],
    }
}

pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> AppResult<()> {
    if allowed_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

/// Authorized y Active tienen el recurso tomado; al cancelarlas se libera
pub fn holds_resource(status: BookingStatus) -> bool {
    matches!(status, Authorized | Active)
}

/// El conductor debe tener una licencia activa y vigente
pub fn ensure_license(license: Option<&DriverLicense>, today: NaiveDate) -> AppResult<()> {
    match license {
        Some(license) if license.is_valid_on(today) => Ok(()),
        Some(license) => Err(AppError::InvalidLicense(format!(
            "La licencia {} no está vigente (vence {})",
            license.license_number, license.expires_on
        ))),
        None => Err(AppError::InvalidLicense(
            "El conductor no tiene una licencia activa".to_string(),
        )),
    }
}

/// Distancia recorrida; el odómetro final debe superar al inicial
pub fn trip_distance(start: Decimal, end: Decimal) -> AppResult<Decimal> {
    if end > start {
        Ok(end - start)
    } else {
        Err(AppError::InvalidOdometer { start, end })
    }
}

/// Datos de cierre de una asignación
#[derive(Debug, Clone, Default)]
pub struct FinalizeData {
    pub end_odometer: Decimal,
    pub end_fuel_level: Option<String>,
    pub returned_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AssignmentTransition {
    Authorize,
    Activate { start_odometer: Option<Decimal> },
    Finalize(FinalizeData),
    Cancel { reason: String },
}

impl AssignmentTransition {
    pub fn target(&self) -> BookingStatus {
        match self {
            AssignmentTransition::Authorize => Authorized,
            AssignmentTransition::Activate { .. } => Active,
            AssignmentTransition::Finalize(_) => Finalized,
            AssignmentTransition::Cancel { .. } => Cancelled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentOutcome {
    pub assignment: Assignment,
    pub trip: Option<TripLog>,
}

/// Verifica que el vehículo exista y admita reservas, que esté libre en la
/// ventana de la asignación y que el conductor tenga licencia vigente.
async fn guard_assignment<T: FleetTx>(
    tx: &mut T,
    assignment: &Assignment,
    ctx: &TransitionContext,
) -> AppResult<()> {
    let vehicle = tx
        .vehicle(assignment.vehicle_id)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", assignment.vehicle_id))?;
    if !vehicle.status.accepts_bookings() {
        return Err(AppError::InvalidState(format!(
            "El vehículo {} no está disponible para asignaciones",
            vehicle.plate
        )));
    }

    ensure_vehicle_free(tx, assignment.vehicle_id, &assignment.window(), Some(assignment.id))
        .await?;

    let license = tx.current_license(assignment.driver_id).await?;
    ensure_license(license.as_ref(), ctx.today())
}

/// Devuelve el vehículo a disponible sólo si estaba en uso y ninguna otra
/// asignación lo retiene. Mantenimiento y baja no se tocan; el odómetro sí.
async fn release_vehicle<T: FleetTx>(
    tx: &mut T,
    vehicle_id: i32,
    odometer: Option<Decimal>,
) -> AppResult<()> {
    let vehicle = tx
        .vehicle(vehicle_id)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;

    let mut status = vehicle.status;
    if status == VehicleStatus::InUse && tx.vehicle_holders(vehicle_id).await? == 0 {
        status = VehicleStatus::Available;
    }
    if status == vehicle.status && odometer.is_none() {
        return Ok(());
    }
    tx.set_vehicle_state(vehicle_id, status, odometer).await
}

pub async fn transition_assignment<T: FleetTx>(
    tx: &mut T,
    id: i32,
    transition: AssignmentTransition,
    ctx: &TransitionContext,
) -> AppResult<AssignmentOutcome> {
    let assignment = tx
        .assignment(id)
        .await?
        .ok_or_else(|| not_found_error("Assignment", id))?;
    let from = assignment.status;
    let to = transition.target();
    ensure_transition(from, to)?;

    let mut trip = None;
    match transition {
        AssignmentTransition::Authorize => {
            guard_assignment(tx, &assignment, ctx).await?;
            tx.set_assignment_status(id, to, None).await?;
            tx.set_vehicle_state(assignment.vehicle_id, VehicleStatus::InUse, None)
                .await?;
        }
        AssignmentTransition::Activate { start_odometer } => {
            guard_assignment(tx, &assignment, ctx).await?;
            let odometer = start_odometer.unwrap_or(assignment.start_odometer);
            if odometer < Decimal::ZERO {
                return Err(validation_error(
                    "startOdometer",
                    "El odómetro inicial no puede ser negativo",
                ));
            }
            tx.set_assignment_status(id, to, None).await?;
            tx.set_vehicle_state(assignment.vehicle_id, VehicleStatus::InUse, Some(odometer))
                .await?;
        }
        AssignmentTransition::Finalize(data) => {
            trip_distance(assignment.start_odometer, data.end_odometer)?;
            let note = data.notes.as_ref().map(|n| format!("Cierre: {}", n));
            tx.set_assignment_status(id, to, note.as_deref()).await?;
            release_vehicle(tx, assignment.vehicle_id, Some(data.end_odometer)).await?;
            let log = NewTripLog {
                assignment_id: id,
                departed_at: assignment.start_at,
                returned_at: data.returned_at.unwrap_or_else(|| ctx.now.naive_utc()),
                start_odometer: assignment.start_odometer,
                end_odometer: data.end_odometer,
                start_fuel_level: assignment.start_fuel_level.clone(),
                end_fuel_level: data.end_fuel_level,
                notes: data.notes,
            };
            trip = Some(tx.insert_trip_log(&log).await?);
        }
        AssignmentTransition::Cancel { reason } => {
            let note = format!("Cancelada por {}: {}", ctx.actor, reason);
            tx.set_assignment_status(id, to, Some(&note)).await?;
            if holds_resource(from) {
                release_vehicle(tx, assignment.vehicle_id, None).await?;
            }
        }
    }

    tracing::info!(
        "🔄 Asignación {}: {} → {} (por {})",
        id,
        from,
        to,
        ctx.actor
    );

    let assignment = tx
        .assignment(id)
        .await?
        .ok_or_else(|| not_found_error("Assignment", id))?;
    Ok(AssignmentOutcome { assignment, trip })
}

#[derive(Debug, Clone)]
pub enum ReservationTransition {
    Authorize,
    Activate,
    Finalize { notes: Option<String> },
    Cancel { reason: String },
}

impl ReservationTransition {
    pub fn target(&self) -> BookingStatus {
        match self {
            ReservationTransition::Authorize => Authorized,
            ReservationTransition::Activate => Active,
            ReservationTransition::Finalize { .. } => Finalized,
            ReservationTransition::Cancel { .. } => Cancelled,
        }
    }

    /// Construye la transición pedida por estado destino
    pub fn to_status(target: BookingStatus, reason: Option<String>) -> AppResult<Self> {
        match target {
            Authorized => Ok(ReservationTransition::Authorize),
            Active => Ok(ReservationTransition::Activate),
            Finalized => Ok(ReservationTransition::Finalize { notes: reason }),
            Cancelled => Ok(ReservationTransition::Cancel {
                reason: reason.unwrap_or_else(|| "Sin motivo".to_string()),
            }),
            Pending => Err(AppError::InvalidState(
                "Una reserva no puede volver a pendiente".to_string(),
            )),
        }
    }
}

pub async fn transition_reservation<T: ReservationTx>(
    tx: &mut T,
    id: i32,
    transition: ReservationTransition,
    ctx: &TransitionContext,
) -> AppResult<Reservation> {
    let reservation = tx
        .reservation(id)
        .await?
        .ok_or_else(|| not_found_error("Reservation", id))?;
    let from = reservation.status;
    let to = transition.target();
    ensure_transition(from, to)?;

    let note = match &transition {
        ReservationTransition::Authorize => {
            if tx.payment_for(id).await?.is_none() {
                return Err(AppError::InvalidState(
                    "La reserva no puede autorizarse sin un pago registrado".to_string(),
                ));
            }
            guard_reservation(tx, &reservation).await?;
            None
        }
        ReservationTransition::Activate => {
            guard_reservation(tx, &reservation).await?;
            None
        }
        ReservationTransition::Finalize { notes } => notes.as_ref().map(|n| format!("Cierre: {}", n)),
        ReservationTransition::Cancel { reason } => {
            Some(format!("Cancelada por {}: {}", ctx.actor, reason))
        }
    };
    tx.set_reservation_status(id, to, note.as_deref()).await?;

    tracing::info!("🔄 Reserva {}: {} → {} (por {})", id, from, to, ctx.actor);

    tx.reservation(id)
        .await?
        .ok_or_else(|| not_found_error("Reservation", id))
}

async fn guard_reservation<T: ReservationTx>(tx: &mut T, reservation: &Reservation) -> AppResult<()> {
    let window = reservation
        .window()
        .ok_or_else(|| validation_error("endTime", "La hora de fin debe ser posterior al inicio"))?;
    ensure_room_free(
        tx,
        reservation.room_id,
        reservation.event_date,
        &window,
        Some(reservation.id),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vehicle::LicenseStatus;

    const ALL: [BookingStatus; 5] = [Pending, Authorized, Active, Finalized, Cancelled];

    #[test]
    fn terminal_states_reject_every_target() {
        for from in [Finalized, Cancelled] {
            for to in ALL {
                assert!(matches!(
                    ensure_transition(from, to),
                    Err(AppError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn forward_and_sideways_moves_are_legal() {
        assert!(ensure_transition(Pending, Authorized).is_ok());
        assert!(ensure_transition(Pending, Cancelled).is_ok());
        assert!(ensure_transition(Authorized, Active).is_ok());
        assert!(ensure_transition(Authorized, Finalized).is_ok());
        assert!(ensure_transition(Active, Finalized).is_ok());
        assert!(ensure_transition(Active, Cancelled).is_ok());
    }

    #[test]
    fn backward_moves_are_rejected() {
        assert!(ensure_transition(Active, Pending).is_err());
        assert!(ensure_transition(Authorized, Pending).is_err());
        assert!(ensure_transition(Pending, Finalized).is_err());
        assert!(ensure_transition(Pending, Active).is_err());
    }

    #[test]
    fn only_taken_states_hold_the_resource() {
        assert!(holds_resource(Authorized));
        assert!(holds_resource(Active));
        assert!(!holds_resource(Pending));
    }

    #[test]
    fn odometer_must_increase() {
        assert_eq!(
            trip_distance(Decimal::from(100), Decimal::from(150)).unwrap(),
            Decimal::from(50)
        );
        assert!(matches!(
            trip_distance(Decimal::from(100), Decimal::from(100)),
            Err(AppError::InvalidOdometer { .. })
        ));
    }

    #[test]
    fn missing_or_expired_license_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(matches!(ensure_license(None, today), Err(AppError::InvalidLicense(_))));

        let expired = DriverLicense {
            id: 1,
            employee_id: 5,
            license_number: "C-778".to_string(),
            license_type: "C".to_string(),
            issued_on: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            expires_on: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            status: LicenseStatus::Active,
            restrictions: None,
            created_by: "admin".to_string(),
            created_at: Utc::now(),
        };
        assert!(ensure_license(Some(&expired), today).is_err());
    }

    #[test]
    fn pending_is_not_a_requestable_target() {
        assert!(ReservationTransition::to_status(Pending, None).is_err());
        assert_eq!(
            ReservationTransition::to_status(Cancelled, None).unwrap().target(),
            Cancelled
        );
    }
}
