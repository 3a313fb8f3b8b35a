//! Almacén en memoria para tests
//!
//! Cada transacción trabaja sobre una copia de los datos; `commit` la
//! publica y `rollback` (o soltarla) la descarta. Permite inyectar fallos
//! en puntos concretos para verificar la atomicidad.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::store::{missing_row, FleetTx, ReservationTx, Store, StoreTx};
use crate::models::{
    audit::NewAuditRecord,
    booking::{append_note, BookingStatus, ConflictingBooking, ResourceKey, TimeWindow},
    reservation::{
        DetailKind, DetailSelection, ExternalRequester, NewExternalRequester, NewPayment,
        NewReservation, Payment, Reservation,
    },
    room::Room,
    vehicle::{
        Assignment, AssignmentChanges, DriverLicense, LicenseStatus, NewAssignment, NewTripLog,
        TripLog, Vehicle, VehicleStatus,
    },
};
use crate::services::lifecycle::holds_resource;
use crate::utils::errors::{AppError, AppResult};

/// Operaciones donde se puede forzar un error de almacén
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertDetail,
    InsertTripLog,
    InsertPayment,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryData {
    pub vehicles: HashMap<i32, Vehicle>,
    pub licenses: HashMap<i32, DriverLicense>,
    pub assignments: HashMap<i32, Assignment>,
    pub trip_logs: Vec<TripLog>,
    pub rooms: HashMap<i32, Room>,
    pub reservations: HashMap<i32, Reservation>,
    pub requesters: Vec<ExternalRequester>,
    pub catalog: HashSet<(DetailKind, i32)>,
    pub details: Vec<(i32, DetailSelection)>,
    pub payments: Vec<Payment>,
    pub audits: Vec<NewAuditRecord>,
    next_id: i32,
}

impl MemoryData {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
    faults: Arc<Mutex<HashSet<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copia del estado confirmado
    pub fn snapshot(&self) -> MemoryData {
        self.data.lock().unwrap().clone()
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.faults.lock().unwrap().insert(point);
    }

    fn should_fail(&self, point: FailPoint) -> bool {
        self.faults.lock().unwrap().contains(&point)
    }

    fn seed<F: FnOnce(&mut MemoryData) -> i32>(&self, f: F) -> i32 {
        let mut data = self.data.lock().unwrap();
        f(&mut data)
    }

    pub fn add_vehicle(&self, plate: &str, odometer: Decimal) -> i32 {
        self.seed(|data| {
            let id = data.next_id();
            data.vehicles.insert(
                id,
                Vehicle {
                    id,
                    vehicle_type_id: 1,
                    plate: plate.to_string(),
                    brand: "Toyota".to_string(),
                    model: "Hilux".to_string(),
                    year: Some(2022),
                    color: None,
                    chassis_number: None,
                    engine_number: None,
                    registration_card: None,
                    registration_expires_on: None,
                    insurance_policy: None,
                    insurance_expires_on: None,
                    current_odometer: odometer,
                    status: VehicleStatus::Available,
                    notes: None,
                    created_by: "seed".to_string(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
            id
        })
    }

    pub fn add_license(&self, employee_id: i32, expires_on: NaiveDate, status: LicenseStatus) -> i32 {
        self.seed(|data| {
            let id = data.next_id();
            data.licenses.insert(
                id,
                DriverLicense {
                    id,
                    employee_id,
                    license_number: format!("LIC-{}", employee_id),
                    license_type: "B".to_string(),
                    issued_on: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
                    expires_on,
                    status,
                    restrictions: None,
                    created_by: "seed".to_string(),
                    created_at: Utc::now(),
                },
            );
            id
        })
    }

    pub fn add_room(&self, name: &str) -> i32 {
        self.seed(|data| {
            let id = data.next_id();
            data.rooms.insert(
                id,
                Room {
                    id,
                    name: name.to_string(),
                    description: None,
                    location: None,
                    max_capacity: 200,
                    active: true,
                    created_by: "seed".to_string(),
                    created_at: Utc::now(),
                },
            );
            id
        })
    }

    pub fn add_catalog_item(&self, kind: DetailKind, id: i32) {
        self.data.lock().unwrap().catalog.insert((kind, id));
    }
}

pub struct MemoryTx {
    working: MemoryData,
    store: MemoryStore,
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        Ok(MemoryTx {
            working: self.snapshot(),
            store: self.clone(),
        })
    }
}

fn injected(point: FailPoint) -> AppError {
    AppError::Database(sqlx::Error::Protocol(format!("injected failure at {:?}", point)))
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_resource(&mut self, _resource: ResourceKey) -> AppResult<()> {
        Ok(())
    }

    async fn insert_audit(&mut self, record: &NewAuditRecord) -> AppResult<()> {
        self.working.audits.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        *self.store.data.lock().unwrap() = self.working;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl FleetTx for MemoryTx {
    async fn vehicle(&mut self, id: i32) -> AppResult<Option<Vehicle>> {
        Ok(self.working.vehicles.get(&id).cloned())
    }

    async fn set_vehicle_state(
        &mut self,
        id: i32,
        status: VehicleStatus,
        odometer: Option<Decimal>,
    ) -> AppResult<()> {
        let vehicle = self
            .working
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| missing_row("vehicle", id))?;
        vehicle.status = status;
        if let Some(odometer) = odometer {
            vehicle.current_odometer = odometer;
        }
        Ok(())
    }

    async fn retire_vehicle(&mut self, id: i32, note: &str) -> AppResult<()> {
        let vehicle = self
            .working
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| missing_row("vehicle", id))?;
        vehicle.status = VehicleStatus::Inactive;
        vehicle.notes = Some(append_note(vehicle.notes.as_deref(), note));
        Ok(())
    }

    async fn current_license(&mut self, driver_id: i32) -> AppResult<Option<DriverLicense>> {
        Ok(self
            .working
            .licenses
            .values()
            .filter(|l| l.employee_id == driver_id && l.status == LicenseStatus::Active)
            .max_by_key(|l| l.expires_on)
            .cloned())
    }

    async fn license(&mut self, id: i32) -> AppResult<Option<DriverLicense>> {
        Ok(self.working.licenses.get(&id).cloned())
    }

    async fn delete_license(&mut self, id: i32) -> AppResult<()> {
        self.working
            .licenses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing_row("license", id))
    }

    async fn assignment_conflicts(
        &mut self,
        vehicle_id: i32,
        window: &TimeWindow,
        exclude: Option<i32>,
    ) -> AppResult<Vec<ConflictingBooking>> {
        let resource_name = self
            .working
            .vehicles
            .get(&vehicle_id)
            .map(|v| v.plate.clone())
            .unwrap_or_default();

        let mut conflicts: Vec<ConflictingBooking> = self
            .working
            .assignments
            .values()
            .filter(|a| a.vehicle_id == vehicle_id && a.status.is_blocking())
            .filter(|a| Some(a.id) != exclude)
            .filter(|a| a.window().overlaps(window))
            .map(|a| ConflictingBooking {
                id: a.id,
                title: a.purpose.clone(),
                start_at: a.start_at,
                end_at: a.end_at,
                resource_name: resource_name.clone(),
            })
            .collect();
        conflicts.sort_by_key(|c| c.start_at);
        Ok(conflicts)
    }

    async fn open_assignments_for_vehicle(&mut self, vehicle_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .assignments
            .values()
            .filter(|a| a.vehicle_id == vehicle_id && a.status.is_blocking())
            .count() as i64)
    }

    async fn vehicle_holders(&mut self, vehicle_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .assignments
            .values()
            .filter(|a| a.vehicle_id == vehicle_id && holds_resource(a.status))
            .count() as i64)
    }

    async fn open_assignments_for_driver(&mut self, driver_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .assignments
            .values()
            .filter(|a| a.driver_id == driver_id && a.status.is_blocking())
            .count() as i64)
    }

    async fn insert_assignment(&mut self, new: &NewAssignment) -> AppResult<i32> {
        let id = self.working.next_id();
        self.working.assignments.insert(
            id,
            Assignment {
                id,
                vehicle_id: new.vehicle_id,
                driver_id: new.driver_id,
                requester_id: new.requester_id,
                assignment_type_id: new.assignment_type_id,
                start_at: new.window.start,
                end_at: new.window.end,
                destination: new.destination.clone(),
                purpose: new.purpose.clone(),
                start_odometer: new.start_odometer,
                start_fuel_level: new.start_fuel_level.clone(),
                notes: new.notes.clone(),
                status: new.status,
                created_by: new.created_by.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn assignment(&mut self, id: i32) -> AppResult<Option<Assignment>> {
        Ok(self.working.assignments.get(&id).cloned())
    }

    async fn update_assignment(&mut self, id: i32, changes: &AssignmentChanges) -> AppResult<()> {
        let assignment = self
            .working
            .assignments
            .get_mut(&id)
            .ok_or_else(|| missing_row("assignment", id))?;
        assignment.driver_id = changes.driver_id;
        assignment.start_at = changes.window.start;
        assignment.end_at = changes.window.end;
        assignment.destination = changes.destination.clone();
        assignment.purpose = changes.purpose.clone();
        assignment.notes = changes.notes.clone();
        assignment.updated_at = Utc::now();
        Ok(())
    }

    async fn set_assignment_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        note: Option<&str>,
    ) -> AppResult<()> {
        let assignment = self
            .working
            .assignments
            .get_mut(&id)
            .ok_or_else(|| missing_row("assignment", id))?;
        assignment.status = status;
        if let Some(note) = note {
            assignment.notes = Some(append_note(assignment.notes.as_deref(), note));
        }
        Ok(())
    }

    async fn insert_trip_log(&mut self, log: &NewTripLog) -> AppResult<TripLog> {
        if self.store.should_fail(FailPoint::InsertTripLog) {
            return Err(injected(FailPoint::InsertTripLog));
        }
        let trip = TripLog {
            id: self.working.next_id(),
            assignment_id: log.assignment_id,
            departed_at: log.departed_at,
            returned_at: log.returned_at,
            start_odometer: log.start_odometer,
            end_odometer: log.end_odometer,
            distance: log.distance(),
            start_fuel_level: log.start_fuel_level.clone(),
            end_fuel_level: log.end_fuel_level.clone(),
            notes: log.notes.clone(),
        };
        self.working.trip_logs.push(trip.clone());
        Ok(trip)
    }
}

#[async_trait]
impl ReservationTx for MemoryTx {
    async fn room(&mut self, id: i32) -> AppResult<Option<Room>> {
        Ok(self.working.rooms.get(&id).cloned())
    }

    async fn reservation_conflicts(
        &mut self,
        room_id: i32,
        date: NaiveDate,
        window: &TimeWindow,
        exclude: Option<i32>,
    ) -> AppResult<Vec<ConflictingBooking>> {
        let resource_name = self
            .working
            .rooms
            .get(&room_id)
            .map(|r| r.name.clone())
            .unwrap_or_default();

        let mut conflicts: Vec<ConflictingBooking> = self
            .working
            .reservations
            .values()
            .filter(|r| r.room_id == room_id && r.event_date == date && r.status.is_blocking())
            .filter(|r| Some(r.id) != exclude)
            .filter_map(|r| r.window().filter(|w| w.overlaps(window)).map(|w| (r, w)))
            .map(|(r, w)| ConflictingBooking {
                id: r.id,
                title: r.event_name.clone(),
                start_at: w.start,
                end_at: w.end,
                resource_name: resource_name.clone(),
            })
            .collect();
        conflicts.sort_by_key(|c| c.start_at);
        Ok(conflicts)
    }

    async fn upsert_external_requester(
        &mut self,
        requester: &NewExternalRequester,
    ) -> AppResult<i32> {
        if let Some(existing) = self
            .working
            .requesters
            .iter()
            .find(|r| r.email == requester.email)
        {
            return Ok(existing.id);
        }
        let id = self.working.next_id();
        self.working.requesters.push(ExternalRequester {
            id,
            email: requester.email.clone(),
            full_name: requester.full_name.clone(),
            company: requester.company.clone(),
            phone: requester.phone.clone(),
        });
        Ok(id)
    }

    async fn insert_reservation(&mut self, new: &NewReservation) -> AppResult<i32> {
        let id = self.working.next_id();
        self.working.reservations.insert(
            id,
            Reservation {
                id,
                room_id: new.room_id,
                capacity_id: new.capacity_id,
                room_note: new.room_note.clone(),
                requester_type: new.requester_type,
                employee_id: new.employee_id,
                external_requester_id: new.external_requester_id,
                event_name: new.event_name.clone(),
                event_date: new.event_date,
                start_time: new.start_time,
                end_time: new.end_time,
                attendees: new.attendees,
                requires_tasting: new.requires_tasting,
                notes: new.notes.clone(),
                status: BookingStatus::Pending,
                created_by: new.created_by.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn reservation(&mut self, id: i32) -> AppResult<Option<Reservation>> {
        Ok(self.working.reservations.get(&id).cloned())
    }

    async fn replace_reservation(&mut self, id: i32, new: &NewReservation) -> AppResult<()> {
        let reservation = self
            .working
            .reservations
            .get_mut(&id)
            .ok_or_else(|| missing_row("reservation", id))?;
        reservation.room_id = new.room_id;
        reservation.capacity_id = new.capacity_id;
        reservation.room_note = new.room_note.clone();
        reservation.requester_type = new.requester_type;
        reservation.employee_id = new.employee_id;
        reservation.external_requester_id = new.external_requester_id;
        reservation.event_name = new.event_name.clone();
        reservation.event_date = new.event_date;
        reservation.start_time = new.start_time;
        reservation.end_time = new.end_time;
        reservation.attendees = new.attendees;
        reservation.requires_tasting = new.requires_tasting;
        reservation.notes = new.notes.clone();
        reservation.updated_at = Utc::now();
        Ok(())
    }

    async fn set_reservation_status(
        &mut self,
        id: i32,
        status: BookingStatus,
        note: Option<&str>,
    ) -> AppResult<()> {
        let reservation = self
            .working
            .reservations
            .get_mut(&id)
            .ok_or_else(|| missing_row("reservation", id))?;
        reservation.status = status;
        if let Some(note) = note {
            reservation.notes = Some(append_note(reservation.notes.as_deref(), note));
        }
        Ok(())
    }

    async fn catalog_item_exists(&mut self, kind: DetailKind, item_id: i32) -> AppResult<bool> {
        Ok(self.working.catalog.contains(&(kind, item_id)))
    }

    async fn insert_detail(
        &mut self,
        reservation_id: i32,
        detail: &DetailSelection,
    ) -> AppResult<()> {
        if self.store.should_fail(FailPoint::InsertDetail) {
            return Err(injected(FailPoint::InsertDetail));
        }
        self.working.details.push((reservation_id, detail.clone()));
        Ok(())
    }

    async fn delete_details(&mut self, reservation_id: i32) -> AppResult<u64> {
        let before = self.working.details.len();
        self.working.details.retain(|(id, _)| *id != reservation_id);
        Ok((before - self.working.details.len()) as u64)
    }

    async fn payment_for(&mut self, reservation_id: i32) -> AppResult<Option<Payment>> {
        Ok(self
            .working
            .payments
            .iter()
            .find(|p| p.reservation_id == reservation_id)
            .cloned())
    }

    async fn insert_payment(&mut self, new: &NewPayment) -> AppResult<Payment> {
        if self.store.should_fail(FailPoint::InsertPayment) {
            return Err(injected(FailPoint::InsertPayment));
        }
        let payment = Payment {
            id: self.working.next_id(),
            reservation_id: new.reservation_id,
            payment_type_id: new.payment_type_id,
            total: new.total,
            advance: new.advance,
            balance: new.balance(),
            receipt_number: new.receipt_number.clone(),
            notes: new.notes.clone(),
            created_by: new.created_by.clone(),
            paid_at: Utc::now(),
        };
        self.working.payments.push(payment.clone());
        Ok(payment)
    }
}
