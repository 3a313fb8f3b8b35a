//! Repositorio de salones, capacidades, costos y servicios asociados

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::dto::room_dto::{
    AddonRequest, CapacityRequest, CostRequest, CreateRoomRequest, UpdateRoomRequest,
};
use crate::models::catalog::CatalogTable;
use crate::models::reservation::DetailKind;
use crate::models::room::{Room, RoomCapacity, RoomCost};
use crate::utils::errors::{not_found_error, AppResult};

use super::catalog_repository::in_use_on_fk;

/// Servicio, equipo o degustación vinculado a un salón
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomAddon {
    pub kind: DetailKind,
    pub item_id: i32,
    pub name: String,
}

#[derive(Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT * FROM rooms WHERE active OR $1 ORDER BY name",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Room> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found_error("Room", id))
    }

    pub async fn create(&self, request: CreateRoomRequest, actor: &str) -> AppResult<Room> {
        let room = sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (name, description, location, max_capacity, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.name.trim())
        .bind(request.description)
        .bind(request.location)
        .bind(request.max_capacity)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("🏛️ Salón {} creado por {}", room.name, actor);
        Ok(room)
    }

    pub async fn update(&self, id: i32, request: UpdateRoomRequest) -> AppResult<Room> {
        sqlx::query_as::<_, Room>(
            r#"
            UPDATE rooms SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                max_capacity = COALESCE($5, max_capacity),
                active = COALESCE($6, active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description)
        .bind(request.location)
        .bind(request.max_capacity)
        .bind(request.active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Room", id))
    }

    /// Baja lógica: las reservas históricas siguen apuntando al salón
    pub async fn deactivate(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE rooms SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Room", id));
        }
        Ok(())
    }

    // Capacidades

    pub async fn capacities(&self, room_id: i32) -> AppResult<Vec<RoomCapacity>> {
        let rows = sqlx::query_as::<_, RoomCapacity>(
            r#"
            SELECT c.id, c.room_id, c.setup_type_id, s.name AS setup_type, c.capacity, c.active
            FROM room_capacities c
            JOIN setup_types s ON s.id = c.setup_type_id
            WHERE c.room_id = $1
            ORDER BY c.capacity DESC
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn add_capacity(
        &self,
        room_id: i32,
        request: CapacityRequest,
    ) -> AppResult<RoomCapacity> {
        let capacity = sqlx::query_as::<_, RoomCapacity>(
            r#"
            WITH inserted AS (
                INSERT INTO room_capacities (room_id, setup_type_id, capacity)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT i.id, i.room_id, i.setup_type_id, s.name AS setup_type, i.capacity, i.active
            FROM inserted i
            JOIN setup_types s ON s.id = i.setup_type_id
            "#,
        )
        .bind(room_id)
        .bind(request.setup_type_id)
        .bind(request.capacity)
        .fetch_one(&self.pool)
        .await?;

        Ok(capacity)
    }

    pub async fn delete_capacity(&self, room_id: i32, capacity_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM room_capacities WHERE id = $1 AND room_id = $2")
            .bind(capacity_id)
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| in_use_on_fk(e, "La capacidad"))?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Capacity", capacity_id));
        }
        Ok(())
    }

    // Costos

    pub async fn costs(&self, room_id: i32) -> AppResult<Vec<RoomCost>> {
        let rows = sqlx::query_as::<_, RoomCost>(
            r#"
            SELECT c.id, c.room_id, c.cost_type_id, t.name AS cost_type, c.amount, c.active
            FROM room_costs c
            JOIN cost_types t ON t.id = c.cost_type_id
            WHERE c.room_id = $1
            ORDER BY c.cost_type_id
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn add_cost(&self, room_id: i32, request: CostRequest) -> AppResult<RoomCost> {
        let cost = sqlx::query_as::<_, RoomCost>(
            r#"
            WITH inserted AS (
                INSERT INTO room_costs (room_id, cost_type_id, amount)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT i.id, i.room_id, i.cost_type_id, t.name AS cost_type, i.amount, i.active
            FROM inserted i
            JOIN cost_types t ON t.id = i.cost_type_id
            "#,
        )
        .bind(room_id)
        .bind(request.cost_type_id)
        .bind(request.amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(cost)
    }

    pub async fn update_cost(
        &self,
        room_id: i32,
        cost_id: i32,
        request: CostRequest,
    ) -> AppResult<RoomCost> {
        sqlx::query_as::<_, RoomCost>(
            r#"
            WITH updated AS (
                UPDATE room_costs SET cost_type_id = $3, amount = $4
                WHERE id = $1 AND room_id = $2
                RETURNING *
            )
            SELECT u.id, u.room_id, u.cost_type_id, t.name AS cost_type, u.amount, u.active
            FROM updated u
            JOIN cost_types t ON t.id = u.cost_type_id
            "#,
        )
        .bind(cost_id)
        .bind(room_id)
        .bind(request.cost_type_id)
        .bind(request.amount)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Cost", cost_id))
    }

    pub async fn delete_cost(&self, room_id: i32, cost_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM room_costs WHERE id = $1 AND room_id = $2")
            .bind(cost_id)
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Cost", cost_id));
        }
        Ok(())
    }

    // Servicios asociados

    pub async fn addons(&self, room_id: i32) -> AppResult<Vec<RoomAddon>> {
        let rows = sqlx::query_as::<_, RoomAddon>(
            r#"
            SELECT a.kind, a.item_id, COALESCE(s.name, e.name, t.name) AS name
            FROM room_addons a
            LEFT JOIN services s ON a.kind = 'service' AND s.id = a.item_id
            LEFT JOIN equipment e ON a.kind = 'equipment' AND e.id = a.item_id
            LEFT JOIN tastings t ON a.kind = 'tasting' AND t.id = a.item_id
            WHERE a.room_id = $1
            ORDER BY a.kind, name
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Vincula un elemento de catálogo; vincular dos veces no es error
    pub async fn link_addon(&self, room_id: i32, request: AddonRequest) -> AppResult<()> {
        let table = CatalogTable::from(request.kind);
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            table.table_name()
        ))
        .bind(request.item_id)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Err(not_found_error(table.slug(), request.item_id));
        }

        sqlx::query(
            r#"
            INSERT INTO room_addons (room_id, kind, item_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(room_id)
        .bind(request.kind)
        .bind(request.item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn unlink_addon(
        &self,
        room_id: i32,
        kind: DetailKind,
        item_id: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM room_addons WHERE room_id = $1 AND kind = $2 AND item_id = $3",
        )
        .bind(room_id)
        .bind(kind)
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Addon", item_id));
        }
        Ok(())
    }
}
