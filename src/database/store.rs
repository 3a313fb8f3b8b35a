//! Adaptador transaccional
//!
//! Los servicios de reservas trabajan contra estos traits y no contra `sqlx`
//! directamente: `PgStore` es la implementación real y `MemoryStore` la
//! usada por los tests. Todo lo que ocurre entre `begin` y `commit` es
//! atómico; soltar una transacción sin `commit` equivale a `rollback`.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{
    audit::NewAuditRecord,
    booking::{BookingStatus, ConflictingBooking, ResourceKey, TimeWindow},
    reservation::{
        DetailKind, DetailSelection, NewExternalRequester, NewPayment, NewReservation, Payment,
        Reservation,
    },
    room::Room,
    vehicle::{
        Assignment, AssignmentChanges, DriverLicense, NewAssignment, NewTripLog, TripLog, Vehicle,
        VehicleStatus,
    },
};
use crate::utils::errors::{AppError, AppResult};

/// Fuente de transacciones
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// Transacción abierta sobre el almacén
#[async_trait]
pub trait StoreTx: FleetTx + ReservationTx + Send + Sized {
    /// Serializa a los escritores de un mismo recurso hasta commit/rollback
    async fn lock_resource(&mut self, resource: ResourceKey) -> AppResult<()>;

    async fn insert_audit(&mut self, record: &NewAuditRecord) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;

    async fn rollback(self) -> AppResult<()>;
}

/// Operaciones de flota dentro de una transacción
#[async_trait]
pub trait FleetTx: Send {
    async fn vehicle(&mut self, id: i32) -> AppResult<Option<Vehicle>>;

    async fn set_vehicle_state(
        &mut self,
        id: i32,
        status: VehicleStatus,
        odometer: Option<Decimal>,
    ) -> AppResult<()>;

    /// Retira el vehículo (estado inactivo) y agrega el motivo a sus notas
    async fn retire_vehicle(&mut self, id: i32, note: &str) -> AppResult<()>;

    /// Licencia activa más reciente del conductor
    async fn current_license(&mut self, driver_id: i32) -> AppResult<Option<DriverLicense>>;

    async fn license(&mut self, id: i32) -> AppResult<Option<DriverLicense>>;

    async fn delete_license(&mut self, id: i32) -> AppResult<()>;

    async fn assignment_conflicts(
        &mut self,
        vehicle_id: i32,
        window: &TimeWindow,
        exclude: Option<i32>,
    ) -> AppResult<Vec<ConflictingBooking>>;

    /// Cantidad de asignaciones no terminales del vehículo
    async fn open_assignments_for_vehicle(&mut self, vehicle_id: i32) -> AppResult<i64>;

    /// Asignaciones autorizadas o activas que retienen el vehículo
    async fn vehicle_holders(&mut self, vehicle_id: i32) -> AppResult<i64>;

    /// Cantidad de asignaciones no terminales del conductor
    async fn open_assignments_for_driver(&mut self, driver_id: i32) -> AppResult<i64>;

    async fn insert_assignment(&mut self, assignment: &NewAssignment) -> AppResult<i32>;

    async fn assignment(&mut self, id: i32) -> AppResult<Option<Assignment>>;

    async fn update_assignment(&mut self, id: i32, changes: &AssignmentChanges) -> AppResult<()>;

    async fn set_assignment_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        note: Option<&str>,
    ) -> AppResult<()>;

    async fn insert_trip_log(&mut self, log: &NewTripLog) -> AppResult<TripLog>;
}

/// Operaciones de reservas de salones dentro de una transacción
#[async_trait]
pub trait ReservationTx: Send {
    async fn room(&mut self, id: i32) -> AppResult<Option<Room>>;

    async fn reservation_conflicts(
        &mut self,
        room_id: i32,
        date: NaiveDate,
        window: &TimeWindow,
        exclude: Option<i32>,
    ) -> AppResult<Vec<ConflictingBooking>>;

    /// Busca por email o inserta; nunca falla por duplicado
    async fn upsert_external_requester(
        &mut self,
        requester: &NewExternalRequester,
    ) -> AppResult<i32>;

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> AppResult<i32>;

    async fn reservation(&mut self, id: i32) -> AppResult<Option<Reservation>>;

    async fn replace_reservation(&mut self, id: i32, reservation: &NewReservation) -> AppResult<()>;

    async fn set_reservation_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        note: Option<&str>,
    ) -> AppResult<()>;

    async fn catalog_item_exists(&mut self, kind: DetailKind, item_id: i32) -> AppResult<bool>;

    async fn insert_detail(&mut self, reservation_id: i32, detail: &DetailSelection)
        -> AppResult<()>;

    async fn delete_details(&mut self, reservation_id: i32) -> AppResult<u64>;

    async fn payment_for(&mut self, reservation_id: i32) -> AppResult<Option<Payment>>;

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment>;
}

/// Cierra la transacción según el resultado: commit si fue exitoso,
/// rollback y el error original si no.
pub async fn finish<T: StoreTx, R: Send>(tx: T, result: AppResult<R>) -> AppResult<R> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!("⚠️ Rollback falló tras error '{}': {}", error, rollback_error);
            }
            Err(error)
        }
    }
}

/// Error para filas que desaparecieron dentro de la transacción
pub fn missing_row(table: &str, id: i32) -> AppError {
    AppError::NotFound(format!("{} {} no existe", table, id))
}
