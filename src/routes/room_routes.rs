use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::dto::room_dto::{
    AddonRequest, CapacityRequest, CostRequest, CreateRoomRequest, UpdateRoomRequest,
};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::reservation::DetailKind;
use crate::models::room::{Room, RoomCapacity, RoomCost};
use crate::repositories::room_repository::{RoomAddon, RoomRepository};
use crate::state::AppState;
use crate::utils::errors::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomListQuery {
    #[serde(default)]
    include_inactive: bool,
}

pub fn create_room_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/:id", get(get_room).put(update_room).delete(deactivate_room))
        .route("/:id/capacities", get(list_capacities).post(add_capacity))
        .route("/:id/capacities/:capacity_id", delete(delete_capacity))
        .route("/:id/costs", get(list_costs).post(add_cost))
        .route("/:id/costs/:cost_id", put(update_cost).delete(delete_cost))
        .route("/:id/addons", get(list_addons).post(link_addon))
        .route("/:id/addons/:kind/:item_id", delete(unlink_addon))
}

async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    let rooms = RoomRepository::new(state.pool)
        .list(query.include_inactive)
        .await?;
    Ok(Json(ApiResponse::success(rooms)))
}

async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Room>>), AppError> {
    request.validate()?;
    let room = RoomRepository::new(state.pool)
        .create(request, &user.actor())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(room, "Salón creado")),
    ))
}

async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    let room = RoomRepository::new(state.pool).find_by_id(id).await?;
    Ok(Json(ApiResponse::success(room)))
}

async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRoomRequest>,
) -> Result<Json<ApiResponse<Room>>, AppError> {
    request.validate()?;
    let room = RoomRepository::new(state.pool).update(id, request).await?;
    Ok(Json(ApiResponse::success(room)))
}

/// Baja lógica: el salón deja de aceptar reservas
async fn deactivate_room(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    RoomRepository::new(state.pool).deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_capacities(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<RoomCapacity>>>, AppError> {
    let rows = RoomRepository::new(state.pool).capacities(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn add_capacity(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CapacityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoomCapacity>>), AppError> {
    request.validate()?;
    let capacity = RoomRepository::new(state.pool)
        .add_capacity(id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(capacity))))
}

async fn delete_capacity(
    State(state): State<AppState>,
    Path((id, capacity_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    RoomRepository::new(state.pool)
        .delete_capacity(id, capacity_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_costs(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<RoomCost>>>, AppError> {
    let rows = RoomRepository::new(state.pool).costs(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn add_cost(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoomCost>>), AppError> {
    request.validate()?;
    let cost = RoomRepository::new(state.pool).add_cost(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(cost))))
}

async fn update_cost(
    State(state): State<AppState>,
    Path((id, cost_id)): Path<(i32, i32)>,
    Json(request): Json<CostRequest>,
) -> Result<Json<ApiResponse<RoomCost>>, AppError> {
    request.validate()?;
    let cost = RoomRepository::new(state.pool)
        .update_cost(id, cost_id, request)
        .await?;
    Ok(Json(ApiResponse::success(cost)))
}

async fn delete_cost(
    State(state): State<AppState>,
    Path((id, cost_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    RoomRepository::new(state.pool).delete_cost(id, cost_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_addons(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<RoomAddon>>>, AppError> {
    let rows = RoomRepository::new(state.pool).addons(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn link_addon(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<AddonRequest>,
) -> Result<StatusCode, AppError> {
    request.validate()?;
    RoomRepository::new(state.pool).link_addon(id, request).await?;
    Ok(StatusCode::CREATED)
}

async fn unlink_addon(
    State(state): State<AppState>,
    Path((id, kind, item_id)): Path<(i32, DetailKind, i32)>,
) -> Result<StatusCode, AppError> {
    RoomRepository::new(state.pool)
        .unlink_addon(id, kind, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
