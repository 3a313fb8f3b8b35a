//! Repositorio de vehículos, mantenimientos y cargas de combustible

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::dto::vehicle_dto::{
    CreateFuelLoadRequest, CreateMaintenanceRequest, CreateVehicleRequest, UpdateVehicleRequest,
    VehicleFilters,
};
use crate::models::catalog::MAINTENANCE_TYPE_CORRECTIVE;
use crate::models::vehicle::{FuelLoad, Maintenance, Vehicle, VehicleStatus};
use crate::utils::errors::{not_found_error, AppError, AppResult};

const MAINTENANCE_COLUMNS: &str = r#"
    m.id, m.vehicle_id, m.maintenance_type_id, t.name AS maintenance_type,
    m.description, m.performed_on, m.odometer, m.cost, m.provider, m.notes,
    m.created_by, m.created_at
"#;

#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE ($1::vehicle_status IS NULL OR status = $1)
              AND ($2::INT IS NULL OR vehicle_type_id = $2)
            ORDER BY plate
            "#,
        )
        .bind(filters.status)
        .bind(filters.vehicle_type_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    pub async fn get(&self, id: i32) -> AppResult<Vehicle> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", id))
    }

    /// Placa duplicada sale como 409 por el índice único
    pub async fn create(&self, request: CreateVehicleRequest, actor: &str) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (
                vehicle_type_id, plate, brand, model, year, color, chassis_number,
                engine_number, registration_card, registration_expires_on,
                insurance_policy, insurance_expires_on, current_odometer, notes, created_by
            )
            VALUES ($1, UPPER($2), $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(request.vehicle_type_id)
        .bind(request.plate.trim())
        .bind(request.brand.trim())
        .bind(request.model.trim())
        .bind(request.year)
        .bind(request.color)
        .bind(request.chassis_number)
        .bind(request.engine_number)
        .bind(request.registration_card)
        .bind(request.registration_expires_on)
        .bind(request.insurance_policy)
        .bind(request.insurance_expires_on)
        .bind(request.current_odometer.unwrap_or(Decimal::ZERO))
        .bind(request.notes)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("🚙 Vehículo {} registrado por {}", vehicle.plate, actor);
        Ok(vehicle)
    }

    /// El estado no se toca aquí; lo cambia `FleetService::change_vehicle_status`
    pub async fn update(&self, id: i32, request: UpdateVehicleRequest) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles SET
                vehicle_type_id = COALESCE($2, vehicle_type_id),
                plate = COALESCE(UPPER($3), plate),
                brand = COALESCE($4, brand),
                model = COALESCE($5, model),
                year = COALESCE($6, year),
                color = COALESCE($7, color),
                registration_expires_on = COALESCE($8, registration_expires_on),
                insurance_expires_on = COALESCE($9, insurance_expires_on),
                insurance_policy = COALESCE($10, insurance_policy),
                notes = COALESCE($11, notes),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.vehicle_type_id)
        .bind(request.plate.as_deref().map(str::trim))
        .bind(request.brand)
        .bind(request.model)
        .bind(request.year)
        .bind(request.color)
        .bind(request.registration_expires_on)
        .bind(request.insurance_expires_on)
        .bind(request.insurance_policy)
        .bind(request.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", id))?;

        Ok(vehicle)
    }

    pub async fn maintenances(&self, vehicle_id: i32) -> AppResult<Vec<Maintenance>> {
        let rows = sqlx::query_as::<_, Maintenance>(&format!(
            r#"
            SELECT {}
            FROM maintenances m
            JOIN maintenance_types t ON t.id = m.maintenance_type_id
            WHERE m.vehicle_id = $1
            ORDER BY m.performed_on DESC, m.id DESC
            "#,
            MAINTENANCE_COLUMNS
        ))
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Registra un mantenimiento; si es correctivo el vehículo queda fuera de servicio
    pub async fn create_maintenance(
        &self,
        vehicle_id: i32,
        request: CreateMaintenanceRequest,
        actor: &str,
    ) -> AppResult<Maintenance> {
        let mut tx = self.pool.begin().await?;

        let status: Option<VehicleStatus> =
            sqlx::query_scalar("SELECT status FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(vehicle_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status {
            None => return Err(not_found_error("Vehicle", vehicle_id)),
            Some(VehicleStatus::Inactive) => {
                return Err(AppError::InvalidState(
                    "El vehículo está dado de baja".to_string(),
                ))
            }
            Some(_) => {}
        }

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO maintenances (
                vehicle_id, maintenance_type_id, description, performed_on,
                odometer, cost, provider, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(vehicle_id)
        .bind(request.maintenance_type_id)
        .bind(request.description.trim())
        .bind(request.performed_on)
        .bind(request.odometer)
        .bind(request.cost)
        .bind(request.provider)
        .bind(request.notes)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        if request.maintenance_type_id == MAINTENANCE_TYPE_CORRECTIVE {
            sqlx::query(
                "UPDATE vehicles SET status = 'maintenance', updated_at = now() WHERE id = $1",
            )
            .bind(vehicle_id)
            .execute(&mut *tx)
            .await?;
            tracing::info!("🔧 Vehículo {} pasa a mantenimiento correctivo", vehicle_id);
        }

        let maintenance = sqlx::query_as::<_, Maintenance>(&format!(
            r#"
            SELECT {}
            FROM maintenances m
            JOIN maintenance_types t ON t.id = m.maintenance_type_id
            WHERE m.id = $1
            "#,
            MAINTENANCE_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(maintenance)
    }

    pub async fn fuel_loads(&self, vehicle_id: i32) -> AppResult<Vec<FuelLoad>> {
        let rows = sqlx::query_as::<_, FuelLoad>(
            "SELECT * FROM fuel_loads WHERE vehicle_id = $1 ORDER BY loaded_at DESC",
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Registra la carga y adelanta el odómetro del vehículo si corresponde
    pub async fn create_fuel_load(
        &self,
        vehicle_id: i32,
        request: CreateFuelLoadRequest,
        actor: &str,
    ) -> AppResult<FuelLoad> {
        let mut tx = self.pool.begin().await?;

        let load = sqlx::query_as::<_, FuelLoad>(
            r#"
            INSERT INTO fuel_loads (
                vehicle_id, assignment_id, liters, total_cost, odometer,
                station, invoice_number, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(vehicle_id)
        .bind(request.assignment_id)
        .bind(request.liters)
        .bind(request.total_cost)
        .bind(request.odometer)
        .bind(request.station)
        .bind(request.invoice_number)
        .bind(request.notes)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE vehicles
            SET current_odometer = GREATEST(current_odometer, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(vehicle_id)
        .bind(request.odometer)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("⛽ Carga de {} L registrada para vehículo {}", load.liters, vehicle_id);
        Ok(load)
    }
}
