//! Servicio de asignaciones de vehículos
//!
//! Orquesta cada operación de escritura como una única transacción:
//! candado del vehículo, validaciones, escrituras y commit. Cualquier error
//! intermedio deja la base exactamente como estaba.

use rust_decimal::Decimal;

use crate::database::store::{finish, FleetTx, Store, StoreTx};
use crate::dto::assignment_dto::{
    AssignmentCreated, AssignmentFinalized, CreateAssignmentRequest, FinalizeAssignmentRequest,
    UpdateAssignmentRequest,
};
use crate::models::audit::{AuditDiff, AuditedEntity};
use crate::models::booking::{BookingStatus, ResourceKey, TimeWindow};
use crate::models::vehicle::{Assignment, AssignmentChanges, NewAssignment, VehicleStatus};
use crate::services::conflict_checker::ensure_vehicle_free;
use crate::services::lifecycle::{
    ensure_license, transition_assignment, AssignmentOutcome, AssignmentTransition, FinalizeData,
    TransitionContext,
};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

/// Arma la ventana de una asignación; sin fin queda abierta
pub fn assignment_window(
    start: chrono::NaiveDateTime,
    end: Option<chrono::NaiveDateTime>,
) -> AppResult<TimeWindow> {
    match end {
        Some(end) => TimeWindow::closed(start, end).ok_or_else(|| {
            validation_error("endAt", "La fecha de fin debe ser posterior a la de inicio")
        }),
        None => Ok(TimeWindow::open(start)),
    }
}

fn describe_end(end: Option<chrono::NaiveDateTime>) -> String {
    end.map(|e| e.to_string()).unwrap_or_else(|| "abierta".to_string())
}

#[derive(Clone)]
pub struct AssignmentService<S: Store> {
    store: S,
}

impl<S: Store> AssignmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Crea una asignación. Sin `requiresApproval` queda activa de inmediato
    /// y el vehículo pasa a en uso con el odómetro de salida.
    pub async fn create(
        &self,
        request: CreateAssignmentRequest,
        ctx: &TransitionContext,
    ) -> AppResult<AssignmentCreated> {
        let window = assignment_window(request.start_at, request.end_at)?;
        let mut tx = self.store.begin().await?;
        let result = create_in(&mut tx, request, window, ctx).await;
        finish(tx, result).await
    }

    /// Edita una asignación pendiente o autorizada
    pub async fn update(
        &self,
        id: i32,
        request: UpdateAssignmentRequest,
        ctx: &TransitionContext,
    ) -> AppResult<Assignment> {
        let window = assignment_window(request.start_at, request.end_at)?;
        let mut tx = self.store.begin().await?;
        let result = update_in(&mut tx, id, request, window, ctx).await;
        finish(tx, result).await
    }

    pub async fn authorize(&self, id: i32, ctx: &TransitionContext) -> AppResult<Assignment> {
        self.transition(id, AssignmentTransition::Authorize, ctx)
            .await
            .map(|outcome| outcome.assignment)
    }

    pub async fn activate(
        &self,
        id: i32,
        start_odometer: Option<Decimal>,
        ctx: &TransitionContext,
    ) -> AppResult<Assignment> {
        self.transition(id, AssignmentTransition::Activate { start_odometer }, ctx)
            .await
            .map(|outcome| outcome.assignment)
    }

    /// Cierra la asignación, libera el vehículo y registra el viaje
    pub async fn finalize(
        &self,
        id: i32,
        request: FinalizeAssignmentRequest,
        ctx: &TransitionContext,
    ) -> AppResult<AssignmentFinalized> {
        let data = FinalizeData {
            end_odometer: request.end_odometer,
            end_fuel_level: request.end_fuel_level,
            returned_at: request.returned_at,
            notes: request.notes,
        };
        let outcome = self
            .transition(id, AssignmentTransition::Finalize(data), ctx)
            .await?;
        Ok(AssignmentFinalized {
            assignment: outcome.assignment,
            trip: outcome.trip,
        })
    }

    pub async fn cancel(
        &self,
        id: i32,
        reason: String,
        ctx: &TransitionContext,
    ) -> AppResult<Assignment> {
        self.transition(id, AssignmentTransition::Cancel { reason }, ctx)
            .await
            .map(|outcome| outcome.assignment)
    }

    async fn transition(
        &self,
        id: i32,
        transition: AssignmentTransition,
        ctx: &TransitionContext,
    ) -> AppResult<AssignmentOutcome> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let vehicle_id = tx
                .assignment(id)
                .await?
                .ok_or_else(|| not_found_error("Assignment", id))?
                .vehicle_id;
            tx.lock_resource(ResourceKey::Vehicle(vehicle_id)).await?;
            transition_assignment(&mut tx, id, transition, ctx).await
        }
        .await;
        finish(tx, result).await
    }
}

async fn create_in<T: StoreTx>(
    tx: &mut T,
    request: CreateAssignmentRequest,
    window: TimeWindow,
    ctx: &TransitionContext,
) -> AppResult<AssignmentCreated> {
    tx.lock_resource(ResourceKey::Vehicle(request.vehicle_id)).await?;

    let vehicle = tx
        .vehicle(request.vehicle_id)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", request.vehicle_id))?;
    if !vehicle.status.accepts_bookings() {
        return Err(AppError::InvalidState(format!(
            "El vehículo {} no está disponible para asignaciones",
            vehicle.plate
        )));
    }

    let license = tx.current_license(request.driver_id).await?;
    ensure_license(license.as_ref(), ctx.today())?;

    ensure_vehicle_free(tx, request.vehicle_id, &window, None).await?;

    let status = if request.requires_approval {
        BookingStatus::Pending
    } else {
        BookingStatus::Active
    };
    let start_odometer = request.start_odometer.unwrap_or(vehicle.current_odometer);

    let id = tx
        .insert_assignment(&NewAssignment {
            vehicle_id: request.vehicle_id,
            driver_id: request.driver_id,
            requester_id: request.requester_id,
            assignment_type_id: request.assignment_type_id,
            window,
            destination: request.destination,
            purpose: request.purpose.trim().to_string(),
            start_odometer,
            start_fuel_level: request.start_fuel_level,
            notes: request.notes,
            status,
            created_by: ctx.actor.clone(),
        })
        .await?;

    if status == BookingStatus::Active {
        tx.set_vehicle_state(request.vehicle_id, VehicleStatus::InUse, Some(start_odometer))
            .await?;
    }

    tracing::info!(
        "🚗 Asignación {} creada para vehículo {} en estado {} (por {})",
        id,
        vehicle.plate,
        status,
        ctx.actor
    );
    Ok(AssignmentCreated { id, status })
}

async fn update_in<T: StoreTx>(
    tx: &mut T,
    id: i32,
    request: UpdateAssignmentRequest,
    window: TimeWindow,
    ctx: &TransitionContext,
) -> AppResult<Assignment> {
    let current = tx
        .assignment(id)
        .await?
        .ok_or_else(|| not_found_error("Assignment", id))?;
    tx.lock_resource(ResourceKey::Vehicle(current.vehicle_id)).await?;

    if !matches!(current.status, BookingStatus::Pending | BookingStatus::Authorized) {
        return Err(AppError::InvalidState(format!(
            "Sólo se editan asignaciones pendientes o autorizadas (estado actual: {})",
            current.status
        )));
    }

    ensure_vehicle_free(tx, current.vehicle_id, &window, Some(id)).await?;

    if request.driver_id != current.driver_id {
        let license = tx.current_license(request.driver_id).await?;
        ensure_license(license.as_ref(), ctx.today())?;
    }

    let purpose = request.purpose.trim().to_string();
    let reason = request.change_reason.as_deref();
    let records = AuditDiff::new(AuditedEntity::Assignment, id, &ctx.actor)
        .field("start_at", &current.start_at, &window.start, reason)
        .field(
            "end_at",
            &describe_end(current.end_at),
            &describe_end(window.end),
            reason,
        )
        .field("purpose", &current.purpose, &purpose, reason)
        .into_records();
    for record in &records {
        tx.insert_audit(record).await?;
    }

    tx.update_assignment(
        id,
        &AssignmentChanges {
            driver_id: request.driver_id,
            window,
            destination: request.destination,
            purpose,
            notes: request.notes,
        },
    )
    .await?;

    tracing::info!(
        "✏️ Asignación {} editada por {} ({} campo(s) auditados)",
        id,
        ctx.actor,
        records.len()
    );

    tx.assignment(id)
        .await?
        .ok_or_else(|| not_found_error("Assignment", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::{FailPoint, MemoryStore};
    use crate::models::vehicle::LicenseStatus;
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    const DRIVER: i32 = 5;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn ctx() -> TransitionContext {
        let mut ctx = TransitionContext::new("flota@empresa.com");
        ctx.now = at(1, 7).and_utc();
        ctx
    }

    fn setup() -> (MemoryStore, i32) {
        let store = MemoryStore::new();
        let vehicle = store.add_vehicle("P-123ABC", Decimal::from(100));
        store.add_license(
            DRIVER,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            LicenseStatus::Active,
        );
        (store, vehicle)
    }

    fn request(vehicle_id: i32, start: NaiveDateTime, end: Option<NaiveDateTime>) -> CreateAssignmentRequest {
        CreateAssignmentRequest {
            vehicle_id,
            driver_id: DRIVER,
            requester_id: 9,
            assignment_type_id: None,
            start_at: start,
            end_at: end,
            destination: Some("Planta norte".to_string()),
            purpose: "Traslado de equipo".to_string(),
            start_odometer: None,
            start_fuel_level: Some("3/4".to_string()),
            notes: None,
            requires_approval: false,
        }
    }

    fn finalize_at(end_odometer: i64) -> FinalizeAssignmentRequest {
        FinalizeAssignmentRequest {
            end_odometer: Decimal::from(end_odometer),
            end_fuel_level: Some("1/2".to_string()),
            returned_at: Some(at(1, 17)),
            notes: Some("Sin novedad".to_string()),
        }
    }

    #[tokio::test]
    async fn happy_path_creates_and_finalizes_with_trip_log() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());

        let created = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();
        assert_eq!(created.status, BookingStatus::Active);
        assert_eq!(store.snapshot().vehicles[&vehicle].status, VehicleStatus::InUse);

        let finalized = service.finalize(created.id, finalize_at(150), &ctx()).await.unwrap();
        assert_eq!(finalized.assignment.status, BookingStatus::Finalized);
        assert_eq!(finalized.trip.as_ref().unwrap().distance, Decimal::from(50));

        let data = store.snapshot();
        assert_eq!(data.vehicles[&vehicle].status, VehicleStatus::Available);
        assert_eq!(data.vehicles[&vehicle].current_odometer, Decimal::from(150));
        assert_eq!(data.trip_logs.len(), 1);
        assert_eq!(data.trip_logs[0].distance, Decimal::from(50));
        assert!(data.assignments[&created.id]
            .notes
            .as_deref()
            .unwrap()
            .contains("Cierre: Sin novedad"));
    }

    #[tokio::test]
    async fn invalid_license_writes_nothing() {
        let store = MemoryStore::new();
        let vehicle = store.add_vehicle("P-123ABC", Decimal::from(100));
        store.add_license(
            DRIVER,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            LicenseStatus::Active,
        );
        let service = AssignmentService::new(store.clone());

        let result = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await;
        assert!(matches!(result, Err(AppError::InvalidLicense(_))));

        let data = store.snapshot();
        assert!(data.assignments.is_empty());
        assert_eq!(data.vehicles[&vehicle].status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn overlapping_assignment_is_rejected_with_conflicts() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());

        let first = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();

        match service
            .create(request(vehicle, at(1, 12), Some(at(1, 20))), &ctx())
            .await
        {
            Err(AppError::Conflict { conflicts, .. }) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, first.id);
            }
            other => panic!("expected conflict, got {:?}", other.map(|c| c.id)),
        }

        let back_to_back = service
            .create(request(vehicle, at(1, 17), Some(at(1, 19))), &ctx())
            .await;
        assert!(back_to_back.is_ok());
        assert_eq!(store.snapshot().assignments.len(), 2);
    }

    #[tokio::test]
    async fn vehicle_in_maintenance_rejects_assignments() {
        let (store, vehicle) = setup();
        {
            let mut tx = store.begin().await.unwrap();
            tx.set_vehicle_state(vehicle, VehicleStatus::Maintenance, None)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }
        let service = AssignmentService::new(store.clone());
        let result = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn odometer_must_advance_on_finalize() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let created = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();

        let result = service.finalize(created.id, finalize_at(90), &ctx()).await;
        assert!(matches!(result, Err(AppError::InvalidOdometer { .. })));

        let data = store.snapshot();
        assert_eq!(data.assignments[&created.id].status, BookingStatus::Active);
        assert!(data.trip_logs.is_empty());
    }

    #[tokio::test]
    async fn trip_log_failure_rolls_back_the_finalize() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let created = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();

        store.fail_on(FailPoint::InsertTripLog);
        let result = service.finalize(created.id, finalize_at(150), &ctx()).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let data = store.snapshot();
        assert_eq!(data.assignments[&created.id].status, BookingStatus::Active);
        assert_eq!(data.vehicles[&vehicle].status, VehicleStatus::InUse);
        assert_eq!(data.vehicles[&vehicle].current_odometer, Decimal::from(100));
    }

    #[tokio::test]
    async fn second_cancel_is_a_state_error() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let created = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();

        let cancelled = service
            .cancel(created.id, "Viaje suspendido".to_string(), &ctx())
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(cancelled.notes.unwrap().contains("Viaje suspendido"));
        assert_eq!(store.snapshot().vehicles[&vehicle].status, VehicleStatus::Available);

        let again = service
            .cancel(created.id, "Otra vez".to_string(), &ctx())
            .await;
        assert!(matches!(
            again,
            Err(AppError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Cancelled
            })
        ));
    }

    #[tokio::test]
    async fn finalized_assignment_cannot_be_authorized() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let created = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();
        service.finalize(created.id, finalize_at(120), &ctx()).await.unwrap();

        let result = service.authorize(created.id, &ctx()).await;
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
        assert_eq!(
            store.snapshot().assignments[&created.id].status,
            BookingStatus::Finalized
        );
    }

    #[tokio::test]
    async fn approval_flow_goes_through_authorize_and_activate() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let mut pending = request(vehicle, at(2, 8), Some(at(2, 12)));
        pending.requires_approval = true;

        let created = service.create(pending, &ctx()).await.unwrap();
        assert_eq!(created.status, BookingStatus::Pending);
        assert_eq!(store.snapshot().vehicles[&vehicle].status, VehicleStatus::Available);

        service.authorize(created.id, &ctx()).await.unwrap();
        let active = service
            .activate(created.id, Some(Decimal::from(130)), &ctx())
            .await
            .unwrap();
        assert_eq!(active.status, BookingStatus::Active);

        let data = store.snapshot();
        assert_eq!(data.vehicles[&vehicle].status, VehicleStatus::InUse);
        assert_eq!(data.vehicles[&vehicle].current_odometer, Decimal::from(130));
    }

    #[tokio::test]
    async fn update_audits_changed_fields_and_rejects_active_assignments() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let mut pending = request(vehicle, at(2, 8), Some(at(2, 12)));
        pending.requires_approval = true;
        let created = service.create(pending, &ctx()).await.unwrap();

        let update = UpdateAssignmentRequest {
            driver_id: DRIVER,
            start_at: at(2, 9),
            end_at: Some(at(2, 12)),
            destination: None,
            purpose: "Traslado de equipo".to_string(),
            notes: None,
            change_reason: Some("Cambio de horario".to_string()),
        };
        let updated = service.update(created.id, update.clone(), &ctx()).await.unwrap();
        assert_eq!(updated.start_at, at(2, 9));

        let data = store.snapshot();
        assert_eq!(data.audits.len(), 1);
        assert_eq!(data.audits[0].field, "start_at");
        assert_eq!(data.audits[0].reason.as_deref(), Some("Cambio de horario"));

        let active = service
            .create(request(vehicle, at(3, 8), Some(at(3, 12))), &ctx())
            .await
            .unwrap();
        let result = service.update(active.id, update, &ctx()).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn reversed_window_is_a_validation_error() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let result = service
            .create(request(vehicle, at(1, 17), Some(at(1, 8))), &ctx())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn vehicle_stays_in_use_while_another_assignment_holds_it() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let first = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();
        let second = service
            .create(request(vehicle, at(3, 8), Some(at(3, 17))), &ctx())
            .await
            .unwrap();
        assert_eq!(second.status, BookingStatus::Active);

        service
            .cancel(first.id, "Ruta suspendida".to_string(), &ctx())
            .await
            .unwrap();
        assert_eq!(store.snapshot().vehicles[&vehicle].status, VehicleStatus::InUse);

        service.finalize(second.id, finalize_at(150), &ctx()).await.unwrap();
        let data = store.snapshot();
        assert_eq!(data.vehicles[&vehicle].status, VehicleStatus::Available);
        assert_eq!(data.vehicles[&vehicle].current_odometer, Decimal::from(150));
    }

    #[tokio::test]
    async fn closing_an_assignment_keeps_maintenance() {
        let (store, vehicle) = setup();
        let service = AssignmentService::new(store.clone());
        let cancelled = service
            .create(request(vehicle, at(1, 8), Some(at(1, 17))), &ctx())
            .await
            .unwrap();
        let finalized = service
            .create(request(vehicle, at(3, 8), Some(at(3, 17))), &ctx())
            .await
            .unwrap();
        {
            let mut tx = store.begin().await.unwrap();
            tx.set_vehicle_state(vehicle, VehicleStatus::Maintenance, None)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        service
            .cancel(cancelled.id, "Falla mecánica".to_string(), &ctx())
            .await
            .unwrap();
        assert_eq!(store.snapshot().vehicles[&vehicle].status, VehicleStatus::Maintenance);

        service.finalize(finalized.id, finalize_at(150), &ctx()).await.unwrap();
        let data = store.snapshot();
        assert_eq!(data.vehicles[&vehicle].status, VehicleStatus::Maintenance);
        assert_eq!(data.vehicles[&vehicle].current_odometer, Decimal::from(150));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create { day: u32, hour: u32, len: u32 },
        Reschedule { target: usize, day: u32, hour: u32, len: u32 },
        Cancel { target: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..4, 0u32..20, 1u32..6).prop_map(|(day, hour, len)| Op::Create { day, hour, len }),
            (0usize..8, 1u32..4, 0u32..20, 1u32..6)
                .prop_map(|(target, day, hour, len)| Op::Reschedule { target, day, hour, len }),
            (0usize..8).prop_map(|target| Op::Cancel { target }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn committed_assignments_never_overlap(ops in prop::collection::vec(op_strategy(), 1..16)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (store, vehicle) = setup();
                let service = AssignmentService::new(store.clone());
                let mut created: Vec<i32> = Vec::new();

                for op in ops {
                    match op {
                        Op::Create { day, hour, len } => {
                            let start = at(day, hour);
                            let end = start + chrono::Duration::hours(len as i64);
                            let mut req = request(vehicle, start, Some(end));
                            req.requires_approval = true;
                            if let Ok(c) = service.create(req, &ctx()).await {
                                created.push(c.id);
                            }
                        }
                        Op::Reschedule { target, day, hour, len } => {
                            if let Some(id) = created.get(target % created.len().max(1)) {
                                let start = at(day, hour);
                                let update = UpdateAssignmentRequest {
                                    driver_id: DRIVER,
                                    start_at: start,
                                    end_at: Some(start + chrono::Duration::hours(len as i64)),
                                    destination: None,
                                    purpose: "Traslado de equipo".to_string(),
                                    notes: None,
                                    change_reason: None,
                                };
                                let _ = service.update(*id, update, &ctx()).await;
                            }
                        }
                        Op::Cancel { target } => {
                            if let Some(id) = created.get(target % created.len().max(1)) {
                                let _ = service.cancel(*id, "prueba".to_string(), &ctx()).await;
                            }
                        }
                    }
                }

                let data = store.snapshot();
                let live: Vec<_> = data
                    .assignments
                    .values()
                    .filter(|a| a.status.is_blocking())
                    .collect();
                for (i, a) in live.iter().enumerate() {
                    for b in live.iter().skip(i + 1) {
                        assert!(
                            !a.window().overlaps(&b.window()),
                            "asignaciones {} y {} se traslapan",
                            a.id,
                            b.id
                        );
                    }
                }
            });
        }
    }
}
