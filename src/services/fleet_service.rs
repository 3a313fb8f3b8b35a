//! Bajas y cambios de estado de flota
//!
//! Operaciones de catálogo que sólo se permiten si ninguna asignación
//! abierta depende de la entidad.

use crate::database::store::{finish, FleetTx, Store, StoreTx};
use crate::models::booking::ResourceKey;
use crate::models::vehicle::VehicleStatus;
use crate::services::lifecycle::TransitionContext;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Clone)]
pub struct FleetService<S: Store> {
    store: S,
}

impl<S: Store> FleetService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Da de baja el vehículo (estado inactivo) si no tiene asignaciones abiertas
    pub async fn retire_vehicle(
        &self,
        id: i32,
        reason: &str,
        ctx: &TransitionContext,
    ) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let result = retire_in(&mut tx, id, reason, ctx).await;
        finish(tx, result).await
    }

    /// Cambio manual entre disponible y mantenimiento.
    ///
    /// `InUse` lo pone el ciclo de vida de las asignaciones y `Inactive` la baja;
    /// ninguno de los dos se acepta aquí. Con asignaciones abiertas el cambio
    /// se rechaza para no pisar el estado que ellas mantienen.
    pub async fn change_vehicle_status(
        &self,
        id: i32,
        status: VehicleStatus,
        ctx: &TransitionContext,
    ) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let result = change_status_in(&mut tx, id, status, ctx).await;
        finish(tx, result).await
    }

    /// Borra una licencia si el conductor no tiene asignaciones abiertas
    pub async fn delete_license(&self, id: i32, ctx: &TransitionContext) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let license = tx
                .license(id)
                .await?
                .ok_or_else(|| not_found_error("License", id))?;
            let open = tx.open_assignments_for_driver(license.employee_id).await?;
            if open > 0 {
                return Err(AppError::ResourceInUse(format!(
                    "El conductor tiene {} asignación(es) abiertas",
                    open
                )));
            }
            tx.delete_license(id).await?;
            tracing::info!("🗑️ Licencia {} eliminada por {}", license.license_number, ctx.actor);
            Ok(())
        }
        .await;
        finish(tx, result).await
    }
}

async fn retire_in<T: StoreTx>(
    tx: &mut T,
    id: i32,
    reason: &str,
    ctx: &TransitionContext,
) -> AppResult<()> {
    tx.lock_resource(ResourceKey::Vehicle(id)).await?;
    let vehicle = tx
        .vehicle(id)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", id))?;
    if vehicle.status == VehicleStatus::Inactive {
        return Err(AppError::InvalidState(format!(
            "El vehículo {} ya está dado de baja",
            vehicle.plate
        )));
    }

    let open = tx.open_assignments_for_vehicle(id).await?;
    if open > 0 {
        return Err(AppError::ResourceInUse(format!(
            "El vehículo {} tiene {} asignación(es) abiertas",
            vehicle.plate, open
        )));
    }

    let note = format!("Baja por {}: {}", ctx.actor, reason.trim());
    tx.retire_vehicle(id, &note).await?;
    tracing::info!("🚫 Vehículo {} dado de baja por {}", vehicle.plate, ctx.actor);
    Ok(())
}

async fn change_status_in<T: StoreTx>(
    tx: &mut T,
    id: i32,
    status: VehicleStatus,
    ctx: &TransitionContext,
) -> AppResult<()> {
    match status {
        VehicleStatus::Inactive => {
            return Err(AppError::InvalidState(
                "Use DELETE /vehicles/:id para dar de baja un vehículo".to_string(),
            ))
        }
        VehicleStatus::InUse => {
            return Err(AppError::InvalidState(
                "El estado en uso lo asignan las asignaciones autorizadas o activas".to_string(),
            ))
        }
        VehicleStatus::Available | VehicleStatus::Maintenance => {}
    }

    tx.lock_resource(ResourceKey::Vehicle(id)).await?;
    let vehicle = tx
        .vehicle(id)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", id))?;
    if vehicle.status == VehicleStatus::Inactive {
        return Err(AppError::InvalidState(format!(
            "El vehículo {} está dado de baja",
            vehicle.plate
        )));
    }
    if vehicle.status == status {
        return Ok(());
    }

    let open = tx.open_assignments_for_vehicle(id).await?;
    if open > 0 {
        return Err(AppError::ResourceInUse(format!(
            "El vehículo {} tiene {} asignación(es) abiertas",
            vehicle.plate, open
        )));
    }

    tx.set_vehicle_state(id, status, None).await?;
    tracing::info!(
        "🔧 Vehículo {} pasa de {:?} a {:?} por {}",
        vehicle.plate,
        vehicle.status,
        status,
        ctx.actor
    );
    Ok(())
}
