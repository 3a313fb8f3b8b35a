use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::vehicle_dto::{
    CreateFuelLoadRequest, CreateLicenseRequest, CreateMaintenanceRequest, CreateVehicleRequest,
    UpdateLicenseRequest, UpdateVehicleRequest, VehicleFilters,
};
use crate::dto::{ApiResponse, ReasonRequest};
use crate::models::auth::AuthenticatedUser;
use crate::models::vehicle::{DriverLicense, FuelLoad, Maintenance, Vehicle};
use crate::repositories::license_repository::{DriverRow, LicenseRepository};
use crate::repositories::vehicle_repository::VehicleRepository;
use crate::state::AppState;
use crate::utils::errors::AppError;

use super::context;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route(
            "/:id",
            get(get_vehicle).put(update_vehicle).delete(retire_vehicle),
        )
        .route(
            "/:id/maintenances",
            get(list_maintenances).post(create_maintenance),
        )
        .route("/:id/fuel-loads", get(list_fuel_loads).post(create_fuel_load))
}

pub fn create_license_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_licenses).post(create_license))
        .route(
            "/:id",
            get(get_license).put(update_license).delete(delete_license),
        )
}

pub fn create_driver_router() -> Router<AppState> {
    Router::new().route("/", get(list_drivers))
}

// Vehículos

async fn list_vehicles(
    State(state): State<AppState>,
    Query(filters): Query<VehicleFilters>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let vehicles = VehicleRepository::new(state.pool).list(&filters).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn create_vehicle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vehicle>>), AppError> {
    request.validate()?;
    let vehicle = VehicleRepository::new(state.pool)
        .create(request, &user.actor())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(vehicle, "Vehículo creado exitosamente")),
    ))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let vehicle = VehicleRepository::new(state.pool).get(id).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

/// El cambio de estado pasa primero por el servicio de flota
async fn update_vehicle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(mut request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    request.validate()?;
    if let Some(status) = request.status.take() {
        state
            .fleet
            .change_vehicle_status(id, status, &context(&user))
            .await?;
    }
    let vehicle = VehicleRepository::new(state.pool).update(id, request).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

/// Baja lógica; bloqueada si hay asignaciones abiertas
async fn retire_vehicle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    request.validate()?;
    state
        .fleet
        .retire_vehicle(id, &request.reason, &context(&user))
        .await?;
    Ok(Json(ApiResponse::success_with_message((), "Vehículo dado de baja")))
}

async fn list_maintenances(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<Maintenance>>>, AppError> {
    let rows = VehicleRepository::new(state.pool).maintenances(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn create_maintenance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<CreateMaintenanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Maintenance>>), AppError> {
    request.validate()?;
    let maintenance = VehicleRepository::new(state.pool)
        .create_maintenance(id, request, &user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(maintenance))))
}

async fn list_fuel_loads(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<FuelLoad>>>, AppError> {
    let rows = VehicleRepository::new(state.pool).fuel_loads(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn create_fuel_load(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<CreateFuelLoadRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FuelLoad>>), AppError> {
    request.validate()?;
    let load = VehicleRepository::new(state.pool)
        .create_fuel_load(id, request, &user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(load))))
}

// Licencias

async fn list_licenses(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DriverLicense>>>, AppError> {
    let licenses = LicenseRepository::new(state.pool).list().await?;
    Ok(Json(ApiResponse::success(licenses)))
}

async fn create_license(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DriverLicense>>), AppError> {
    request.validate()?;
    let license = LicenseRepository::new(state.pool)
        .create(request, &user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(license))))
}

async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<DriverLicense>>, AppError> {
    let license = LicenseRepository::new(state.pool).find_by_id(id).await?;
    Ok(Json(ApiResponse::success(license)))
}

async fn update_license(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLicenseRequest>,
) -> Result<Json<ApiResponse<DriverLicense>>, AppError> {
    request.validate()?;
    let license = LicenseRepository::new(state.pool).update(id, request).await?;
    Ok(Json(ApiResponse::success(license)))
}

async fn delete_license(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.fleet.delete_license(id, &context(&user)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_drivers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DriverRow>>>, AppError> {
    let drivers = LicenseRepository::new(state.pool).drivers().await?;
    Ok(Json(ApiResponse::success(drivers)))
}
