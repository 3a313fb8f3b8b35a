//! Implementación PostgreSQL del adaptador transaccional
//!
//! Cada `PgTx` envuelve una `sqlx::Transaction`; si se suelta sin `commit`
//! (error, timeout de statement, request cancelada) sqlx hace rollback.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::store::{missing_row, FleetTx, ReservationTx, Store, StoreTx};
use crate::models::{
    audit::NewAuditRecord,
    booking::{BookingStatus, ConflictingBooking, ResourceKey, TimeWindow},
    catalog::CatalogTable,
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
use crate::utils::errors::AppResult;

/// Fragmento SQL para agregar una nota con el separador `" | "`
const APPEND_NOTE: &str = "CASE WHEN $3::TEXT IS NULL THEN notes \
     WHEN notes IS NULL OR notes = '' THEN $3 \
     ELSE notes || ' | ' || $3 END";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_resource(&mut self, resource: ResourceKey) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(resource.lock_key())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_audit(&mut self, record: &NewAuditRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (entity, entity_id, field, old_value, new_value, reason, actor)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.entity)
        .bind(record.entity_id)
        .bind(record.field)
        .bind(&record.old_value)
        .bind(&record.new_value)
        .bind(&record.reason)
        .bind(&record.actor)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl FleetTx for PgTx {
    async fn vehicle(&mut self, id: i32) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(vehicle)
    }

    async fn set_vehicle_state(
        &mut self,
        id: i32,
        status: VehicleStatus,
        odometer: Option<Decimal>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET status = $2,
                current_odometer = COALESCE($3, current_odometer),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(odometer)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("vehicle", id));
        }
        Ok(())
    }

    async fn retire_vehicle(&mut self, id: i32, note: &str) -> AppResult<()> {
        let sql = format!(
            "UPDATE vehicles SET status = $2, notes = {}, updated_at = now() WHERE id = $1",
            APPEND_NOTE
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(VehicleStatus::Inactive)
            .bind(note)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("vehicle", id));
        }
        Ok(())
    }

    async fn current_license(&mut self, driver_id: i32) -> AppResult<Option<DriverLicense>> {
        let license = sqlx::query_as::<_, DriverLicense>(
            r#"
            SELECT * FROM driver_licenses
            WHERE employee_id = $1 AND status = 'active'
            ORDER BY expires_on DESC
            LIMIT 1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(license)
    }

    async fn license(&mut self, id: i32) -> AppResult<Option<DriverLicense>> {
        let license =
            sqlx::query_as::<_, DriverLicense>("SELECT * FROM driver_licenses WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(license)
    }

    async fn delete_license(&mut self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM driver_licenses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("license", id));
        }
        Ok(())
    }

    async fn assignment_conflicts(
        &mut self,
        vehicle_id: i32,
        window: &TimeWindow,
        exclude: Option<i32>,
    ) -> AppResult<Vec<ConflictingBooking>> {
        let conflicts = sqlx::query_as::<_, ConflictingBooking>(
            r#"
            SELECT a.id,
                   a.purpose AS title,
                   a.start_at,
                   a.end_at,
                   v.brand || ' ' || v.model || ' (' || v.plate || ')' AS resource_name
            FROM vehicle_assignments a
            INNER JOIN vehicles v ON v.id = a.vehicle_id
            WHERE a.vehicle_id = $1
              AND a.status IN ('pending', 'authorized', 'active')
              AND ($4::INT IS NULL OR a.id <> $4)
              AND ($3::TIMESTAMP IS NULL OR a.start_at < $3)
              AND (a.end_at IS NULL OR a.end_at > $2)
            ORDER BY a.start_at
            "#,
        )
        .bind(vehicle_id)
        .bind(window.start)
        .bind(window.end)
        .bind(exclude)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(conflicts)
    }

    async fn open_assignments_for_vehicle(&mut self, vehicle_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vehicle_assignments
            WHERE vehicle_id = $1 AND status IN ('pending', 'authorized', 'active')
            "#,
        )
        .bind(vehicle_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn vehicle_holders(&mut self, vehicle_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vehicle_assignments
            WHERE vehicle_id = $1 AND status IN ('authorized', 'active')
            "#,
        )
        .bind(vehicle_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn open_assignments_for_driver(&mut self, driver_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vehicle_assignments
            WHERE driver_id = $1 AND status IN ('pending', 'authorized', 'active')
            "#,
        )
        .bind(driver_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert_assignment(&mut self, assignment: &NewAssignment) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO vehicle_assignments (
                vehicle_id, driver_id, requester_id, assignment_type_id, start_at, end_at,
                destination, purpose, start_odometer, start_fuel_level, notes, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(assignment.vehicle_id)
        .bind(assignment.driver_id)
        .bind(assignment.requester_id)
        .bind(assignment.assignment_type_id)
        .bind(assignment.window.start)
        .bind(assignment.window.end)
        .bind(&assignment.destination)
        .bind(&assignment.purpose)
        .bind(assignment.start_odometer)
        .bind(&assignment.start_fuel_level)
        .bind(&assignment.notes)
        .bind(assignment.status)
        .bind(&assignment.created_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn assignment(&mut self, id: i32) -> AppResult<Option<Assignment>> {
        let assignment =
            sqlx::query_as::<_, Assignment>("SELECT * FROM vehicle_assignments WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(assignment)
    }

    async fn update_assignment(&mut self, id: i32, changes: &AssignmentChanges) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE vehicle_assignments
            SET driver_id = $2,
                start_at = $3,
                end_at = $4,
                destination = $5,
                purpose = $6,
                notes = $7,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.driver_id)
        .bind(changes.window.start)
        .bind(changes.window.end)
        .bind(&changes.destination)
        .bind(&changes.purpose)
        .bind(&changes.notes)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("assignment", id));
        }
        Ok(())
    }

    async fn set_assignment_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        note: Option<&str>,
    ) -> AppResult<()> {
        let sql = format!(
            "UPDATE vehicle_assignments SET status = $2, notes = {}, updated_at = now() WHERE id = $1",
            APPEND_NOTE
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(status)
            .bind(note)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("assignment", id));
        }
        Ok(())
    }

    async fn insert_trip_log(&mut self, log: &NewTripLog) -> AppResult<TripLog> {
        let trip = sqlx::query_as::<_, TripLog>(
            r#"
            INSERT INTO trip_logs (
                assignment_id, departed_at, returned_at, start_odometer, end_odometer,
                start_fuel_level, end_fuel_level, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(log.assignment_id)
        .bind(log.departed_at)
        .bind(log.returned_at)
        .bind(log.start_odometer)
        .bind(log.end_odometer)
        .bind(&log.start_fuel_level)
        .bind(&log.end_fuel_level)
        .bind(&log.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(trip)
    }
}

#[async_trait]
impl ReservationTx for PgTx {
    async fn room(&mut self, id: i32) -> AppResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(room)
    }

    async fn reservation_conflicts(
        &mut self,
        room_id: i32,
        date: NaiveDate,
        window: &TimeWindow,
        exclude: Option<i32>,
    ) -> AppResult<Vec<ConflictingBooking>> {
        let conflicts = sqlx::query_as::<_, ConflictingBooking>(
            r#"
            SELECT r.id,
                   r.event_name AS title,
                   r.event_date + r.start_time AS start_at,
                   r.event_date + r.end_time AS end_at,
                   s.name AS resource_name
            FROM reservations r
            INNER JOIN rooms s ON s.id = r.room_id
            WHERE r.room_id = $1
              AND r.event_date = $2
              AND r.status IN ('pending', 'authorized', 'active')
              AND ($5::INT IS NULL OR r.id <> $5)
              AND ($4::TIMESTAMP IS NULL OR r.event_date + r.start_time < $4)
              AND r.event_date + r.end_time > $3
            ORDER BY r.start_time
            "#,
        )
        .bind(room_id)
        .bind(date)
        .bind(window.start)
        .bind(window.end)
        .bind(exclude)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(conflicts)
    }

    async fn upsert_external_requester(
        &mut self,
        requester: &NewExternalRequester,
    ) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO external_requesters (email, full_name, company, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id
            "#,
        )
        .bind(&requester.email)
        .bind(&requester.full_name)
        .bind(&requester.company)
        .bind(&requester.phone)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reservations (
                room_id, capacity_id, room_note, requester_type, employee_id,
                external_requester_id, event_name, event_date, start_time, end_time,
                attendees, requires_tasting, notes, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', $14)
            RETURNING id
            "#,
        )
        .bind(reservation.room_id)
        .bind(reservation.capacity_id)
        .bind(&reservation.room_note)
        .bind(reservation.requester_type)
        .bind(reservation.employee_id)
        .bind(reservation.external_requester_id)
        .bind(&reservation.event_name)
        .bind(reservation.event_date)
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .bind(reservation.attendees)
        .bind(reservation.requires_tasting)
        .bind(&reservation.notes)
        .bind(&reservation.created_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn reservation(&mut self, id: i32) -> AppResult<Option<Reservation>> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(reservation)
    }

    async fn replace_reservation(&mut self, id: i32, reservation: &NewReservation) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET room_id = $2,
                capacity_id = $3,
                room_note = $4,
                requester_type = $5,
                employee_id = $6,
                external_requester_id = $7,
                event_name = $8,
                event_date = $9,
                start_time = $10,
                end_time = $11,
                attendees = $12,
                requires_tasting = $13,
                notes = $14,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reservation.room_id)
        .bind(reservation.capacity_id)
        .bind(&reservation.room_note)
        .bind(reservation.requester_type)
        .bind(reservation.employee_id)
        .bind(reservation.external_requester_id)
        .bind(&reservation.event_name)
        .bind(reservation.event_date)
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .bind(reservation.attendees)
        .bind(reservation.requires_tasting)
        .bind(&reservation.notes)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("reservation", id));
        }
        Ok(())
    }

    async fn set_reservation_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        note: Option<&str>,
    ) -> AppResult<()> {
        let sql = format!(
            "UPDATE reservations SET status = $2, notes = {}, updated_at = now() WHERE id = $1",
            APPEND_NOTE
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(status)
            .bind(note)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(missing_row("reservation", id));
        }
        Ok(())
    }

    async fn catalog_item_exists(&mut self, kind: DetailKind, item_id: i32) -> AppResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND active)",
            CatalogTable::from(kind).table_name()
        );
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(item_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn insert_detail(
        &mut self,
        reservation_id: i32,
        detail: &DetailSelection,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservation_details (reservation_id, kind, item_id, note)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(reservation_id)
        .bind(detail.kind)
        .bind(detail.item_id)
        .bind(&detail.note)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_details(&mut self, reservation_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM reservation_details WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn payment_for(&mut self, reservation_id: i32) -> AppResult<Option<Payment>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reservation_id = $1")
                .bind(reservation_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(payment)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment> {
        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                reservation_id, payment_type_id, total, advance, balance,
                receipt_number, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(payment.reservation_id)
        .bind(payment.payment_type_id)
        .bind(payment.total)
        .bind(payment.advance)
        .bind(payment.balance())
        .bind(&payment.receipt_number)
        .bind(&payment.notes)
        .bind(&payment.created_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(created)
    }
}
