//! Servicio de reservas de salones
//!
//! Cada escritura es una transacción: candado del salón, chequeo de
//! conflictos, solicitante, reserva y filas de detalle. Si falla cualquier
//! inserción de detalle la reserva tampoco queda.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::database::store::{finish, ReservationTx, Store, StoreTx};
use crate::dto::reservation_dto::{
    DetailItem, OverlapQuery, PaymentRegistered, PaymentRequest, ReservationRequest,
    ReservationSaved, StatusChangeRequest,
};
use crate::models::audit::{AuditDiff, AuditedEntity};
use crate::models::booking::{BookingStatus, ResourceKey, TimeWindow};
use crate::models::reservation::{
    DetailKind, DetailSelection, DetailWarning, NewExternalRequester, NewPayment, NewReservation,
    RequesterType, Reservation,
};
use crate::services::conflict_checker::{check_room, ensure_room_free, ConflictReport};
use crate::services::lifecycle::{transition_reservation, ReservationTransition, TransitionContext};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};
use crate::utils::validation::normalize_email;

pub fn reservation_window(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> AppResult<TimeWindow> {
    TimeWindow::on_date(date, start, end)
        .ok_or_else(|| validation_error("endTime", "La hora de fin debe ser posterior al inicio"))
}

/// Detalles ya resueltos contra sus catálogos más los avisos de lo omitido
#[derive(Debug, Default)]
struct ResolvedDetails {
    selections: Vec<DetailSelection>,
    warnings: Vec<DetailWarning>,
}

impl ResolvedDetails {
    fn skip(&mut self, kind: DetailKind, item: &DetailItem, reason: &str) {
        tracing::warn!("⚠️ Detalle {} '{}' omitido: {}", kind, item.raw(), reason);
        self.warnings.push(DetailWarning {
            kind,
            raw: item.raw(),
            reason: reason.to_string(),
        });
    }
}

async fn resolve_details<T: ReservationTx>(
    tx: &mut T,
    request: &ReservationRequest,
) -> AppResult<ResolvedDetails> {
    let mut resolved = ResolvedDetails::default();
    let mut seen = HashSet::new();
    let groups = [
        (DetailKind::Service, &request.services),
        (DetailKind::Equipment, &request.equipment),
        (DetailKind::Tasting, &request.tastings),
    ];

    for (kind, items) in groups {
        for item in items.iter() {
            if kind == DetailKind::Tasting && !request.requires_tasting {
                resolved.skip(kind, item, "la reserva no incluye degustación");
                continue;
            }
            let Some(item_id) = item.id() else {
                resolved.skip(kind, item, "id inválido");
                continue;
            };
            if !seen.insert((kind, item_id)) {
                resolved.skip(kind, item, "id repetido");
                continue;
            }
            if !tx.catalog_item_exists(kind, item_id).await? {
                resolved.skip(kind, item, "no existe en el catálogo");
                continue;
            }
            resolved.selections.push(DetailSelection {
                kind,
                item_id,
                note: item.note(),
            });
        }
    }
    Ok(resolved)
}

/// Tipo de solicitante con el id interno o externo correspondiente
async fn resolve_requester<T: ReservationTx>(
    tx: &mut T,
    request: &ReservationRequest,
) -> AppResult<(Option<i32>, Option<i32>)> {
    match request.requester_type {
        RequesterType::Internal => {
            let employee_id = request.employee_id.ok_or_else(|| {
                validation_error("employeeId", "Un solicitante interno requiere employeeId")
            })?;
            Ok((Some(employee_id), None))
        }
        RequesterType::External => {
            let external = request.external.as_ref().ok_or_else(|| {
                validation_error("external", "Un solicitante externo requiere email, nombre y empresa")
            })?;
            let id = tx
                .upsert_external_requester(&NewExternalRequester {
                    email: normalize_email(&external.email),
                    full_name: external.full_name.trim().to_string(),
                    company: external.company.trim().to_string(),
                    phone: external.phone.clone(),
                })
                .await?;
            Ok((None, Some(id)))
        }
    }
}

async fn ensure_room_bookable<T: ReservationTx>(tx: &mut T, room_id: i32) -> AppResult<()> {
    let room = tx
        .room(room_id)
        .await?
        .ok_or_else(|| not_found_error("Room", room_id))?;
    if !room.active {
        return Err(AppError::InvalidState(format!(
            "El salón {} está dado de baja",
            room.name
        )));
    }
    Ok(())
}

fn new_reservation(
    request: &ReservationRequest,
    requester: (Option<i32>, Option<i32>),
    ctx: &TransitionContext,
) -> NewReservation {
    NewReservation {
        room_id: request.room_id,
        capacity_id: request.capacity_id,
        room_note: request.room_note.clone(),
        requester_type: request.requester_type,
        employee_id: requester.0,
        external_requester_id: requester.1,
        event_name: request.event_name.trim().to_string(),
        event_date: request.event_date,
        start_time: request.start_time,
        end_time: request.end_time,
        attendees: request.attendees,
        requires_tasting: request.requires_tasting,
        notes: request.notes.clone(),
        created_by: ctx.actor.clone(),
    }
}

#[derive(Clone)]
pub struct ReservationService<S: Store> {
    store: S,
}

impl<S: Store> ReservationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Crea una reserva pendiente con sus servicios, equipo y degustaciones
    pub async fn create(
        &self,
        request: ReservationRequest,
        ctx: &TransitionContext,
    ) -> AppResult<ReservationSaved> {
        let window = reservation_window(request.event_date, request.start_time, request.end_time)?;
        let mut tx = self.store.begin().await?;
        let result = create_in(&mut tx, &request, &window, ctx).await;
        finish(tx, result).await
    }

    /// Reemplaza los datos de una reserva no terminal y sus detalles
    pub async fn update(
        &self,
        id: i32,
        request: ReservationRequest,
        ctx: &TransitionContext,
    ) -> AppResult<ReservationSaved> {
        let window = reservation_window(request.event_date, request.start_time, request.end_time)?;
        let mut tx = self.store.begin().await?;
        let result = update_in(&mut tx, id, &request, &window, ctx).await;
        finish(tx, result).await
    }

    pub async fn set_status(
        &self,
        id: i32,
        request: StatusChangeRequest,
        ctx: &TransitionContext,
    ) -> AppResult<Reservation> {
        let transition = ReservationTransition::to_status(request.status, request.reason)?;
        self.transition(id, transition, ctx).await
    }

    pub async fn cancel(
        &self,
        id: i32,
        reason: String,
        ctx: &TransitionContext,
    ) -> AppResult<Reservation> {
        self.transition(id, ReservationTransition::Cancel { reason }, ctx)
            .await
    }

    /// Registra el pago y autoriza la reserva en la misma transacción
    pub async fn register_payment(
        &self,
        id: i32,
        request: PaymentRequest,
        ctx: &TransitionContext,
    ) -> AppResult<PaymentRegistered> {
        if request.advance > request.total {
            return Err(validation_error("advance", "El anticipo no puede superar el total"));
        }
        let mut tx = self.store.begin().await?;
        let result = payment_in(&mut tx, id, request, ctx).await;
        finish(tx, result).await
    }

    /// Consulta de disponibilidad de sólo lectura
    pub async fn check_overlap(&self, query: OverlapQuery) -> AppResult<ConflictReport> {
        let window = match query.end_time {
            Some(end) => reservation_window(query.date, query.start_time, end)?,
            None => {
                let start = query.date.and_time(query.start_time);
                TimeWindow {
                    start,
                    end: Some(start + Duration::seconds(1)),
                }
            }
        };
        let mut tx = self.store.begin().await?;
        let result = check_room(&mut tx, query.room_id, query.date, &window, query.exclude_id).await;
        if let Err(error) = tx.rollback().await {
            tracing::warn!("⚠️ Rollback de consulta falló: {}", error);
        }
        result
    }

    async fn transition(
        &self,
        id: i32,
        transition: ReservationTransition,
        ctx: &TransitionContext,
    ) -> AppResult<Reservation> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let room_id = tx
                .reservation(id)
                .await?
                .ok_or_else(|| not_found_error("Reservation", id))?
                .room_id;
            tx.lock_resource(ResourceKey::Room(room_id)).await?;
            transition_reservation(&mut tx, id, transition, ctx).await
        }
        .await;
        finish(tx, result).await
    }
}

async fn insert_details<T: ReservationTx>(
    tx: &mut T,
    reservation_id: i32,
    selections: &[DetailSelection],
) -> AppResult<()> {
    for selection in selections {
        tx.insert_detail(reservation_id, selection).await?;
    }
    Ok(())
}

async fn create_in<T: StoreTx>(
    tx: &mut T,
    request: &ReservationRequest,
    window: &TimeWindow,
    ctx: &TransitionContext,
) -> AppResult<ReservationSaved> {
    tx.lock_resource(ResourceKey::Room(request.room_id)).await?;
    ensure_room_bookable(tx, request.room_id).await?;
    ensure_room_free(tx, request.room_id, request.event_date, window, None).await?;

    let requester = resolve_requester(tx, request).await?;
    let id = tx
        .insert_reservation(&new_reservation(request, requester, ctx))
        .await?;

    let details = resolve_details(tx, request).await?;
    insert_details(tx, id, &details.selections).await?;

    tracing::info!(
        "📅 Reserva {} creada para salón {} el {} (por {}, {} detalle(s), {} aviso(s))",
        id,
        request.room_id,
        request.event_date,
        ctx.actor,
        details.selections.len(),
        details.warnings.len()
    );

    let status = tx
        .reservation(id)
        .await?
        .ok_or_else(|| not_found_error("Reservation", id))?
        .status;
    Ok(ReservationSaved {
        id,
        status,
        warnings: details.warnings,
    })
}

async fn update_in<T: StoreTx>(
    tx: &mut T,
    id: i32,
    request: &ReservationRequest,
    window: &TimeWindow,
    ctx: &TransitionContext,
) -> AppResult<ReservationSaved> {
    let current = tx
        .reservation(id)
        .await?
        .ok_or_else(|| not_found_error("Reservation", id))?;

    // Orden fijo de candados para que dos ediciones cruzadas no se bloqueen
    let mut rooms = vec![current.room_id, request.room_id];
    rooms.sort_unstable();
    rooms.dedup();
    for room_id in rooms {
        tx.lock_resource(ResourceKey::Room(room_id)).await?;
    }

    if current.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "La reserva {} ya está {} y no admite cambios",
            id, current.status
        )));
    }

    ensure_room_bookable(tx, request.room_id).await?;
    ensure_room_free(tx, request.room_id, request.event_date, window, Some(id)).await?;

    let requester = resolve_requester(tx, request).await?;
    let replacement = new_reservation(request, requester, ctx);

    let reason = request.change_reason.as_deref();
    let records = AuditDiff::new(AuditedEntity::Reservation, id, &ctx.actor)
        .field("event_date", &current.event_date, &replacement.event_date, reason)
        .field("start_time", &current.start_time, &replacement.start_time, reason)
        .field("end_time", &current.end_time, &replacement.end_time, reason)
        .field("event_name", &current.event_name, &replacement.event_name, reason)
        .into_records();
    for record in &records {
        tx.insert_audit(record).await?;
    }

    tx.replace_reservation(id, &replacement).await?;

    let details = resolve_details(tx, request).await?;
    tx.delete_details(id).await?;
    insert_details(tx, id, &details.selections).await?;

    tracing::info!(
        "✏️ Reserva {} editada por {} ({} campo(s) auditados)",
        id,
        ctx.actor,
        records.len()
    );

    Ok(ReservationSaved {
        id,
        status: current.status,
        warnings: details.warnings,
    })
}

async fn payment_in<T: StoreTx>(
    tx: &mut T,
    id: i32,
    request: PaymentRequest,
    ctx: &TransitionContext,
) -> AppResult<PaymentRegistered> {
    let reservation = tx
        .reservation(id)
        .await?
        .ok_or_else(|| not_found_error("Reservation", id))?;
    tx.lock_resource(ResourceKey::Room(reservation.room_id)).await?;

    if reservation.status != BookingStatus::Pending {
        return Err(AppError::InvalidState(format!(
            "Sólo se registran pagos de reservas pendientes (estado actual: {})",
            reservation.status
        )));
    }
    if tx.payment_for(id).await?.is_some() {
        return Err(AppError::InvalidState(format!(
            "La reserva {} ya tiene un pago registrado",
            id
        )));
    }

    let payment = tx
        .insert_payment(&NewPayment {
            reservation_id: id,
            payment_type_id: request.payment_type_id,
            total: request.total,
            advance: request.advance,
            receipt_number: request.receipt_number,
            notes: request.notes,
            created_by: ctx.actor.clone(),
        })
        .await?;

    let reservation = transition_reservation(tx, id, ReservationTransition::Authorize, ctx).await?;
    tracing::info!("💳 Pago {} registrado para reserva {}", payment.id, id);

    Ok(PaymentRegistered {
        payment,
        status: reservation.status,
    })
}
