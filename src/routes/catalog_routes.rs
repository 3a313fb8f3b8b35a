//! Rutas de catálogos simples
//!
//! `/catalogs/:catalog` expone los nueve catálogos con la misma forma.
//! Cualquier sesión puede leerlos; escribir exige el módulo dueño.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::room_dto::CatalogItemRequest;
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::catalog::{CatalogItem, CatalogTable};
use crate::repositories::catalog_repository::CatalogRepository;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub fn create_catalog_router() -> Router<AppState> {
    Router::new()
        .route("/:catalog", get(list_items).post(create_item))
        .route(
            "/:catalog/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

fn resolve(slug: &str) -> AppResult<CatalogTable> {
    slug.parse::<CatalogTable>().map_err(AppError::NotFound)
}

fn writable(user: &AuthenticatedUser, slug: &str) -> AppResult<CatalogTable> {
    let table = resolve(slug)?;
    if !user.has_module(table.owner()) {
        tracing::warn!("🚫 {} no puede modificar el catálogo {}", user.email, slug);
        return Err(AppError::Forbidden(format!(
            "Sin acceso al módulo {}",
            table.owner()
        )));
    }
    Ok(table)
}

async fn list_items(
    State(state): State<AppState>,
    Path(catalog): Path<String>,
) -> Result<Json<ApiResponse<Vec<CatalogItem>>>, AppError> {
    let table = resolve(&catalog)?;
    let items = CatalogRepository::new(state.pool).list(table).await?;
    Ok(Json(ApiResponse::success(items)))
}

async fn get_item(
    State(state): State<AppState>,
    Path((catalog, id)): Path<(String, i32)>,
) -> Result<Json<ApiResponse<CatalogItem>>, AppError> {
    let table = resolve(&catalog)?;
    let item = CatalogRepository::new(state.pool).find_by_id(table, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

async fn create_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(catalog): Path<String>,
    Json(request): Json<CatalogItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CatalogItem>>), AppError> {
    let table = writable(&user, &catalog)?;
    request.validate()?;
    let item = CatalogRepository::new(state.pool).create(table, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((catalog, id)): Path<(String, i32)>,
    Json(request): Json<CatalogItemRequest>,
) -> Result<Json<ApiResponse<CatalogItem>>, AppError> {
    let table = writable(&user, &catalog)?;
    request.validate()?;
    let item = CatalogRepository::new(state.pool)
        .update(table, id, request)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Borrado físico; falla con 409 si el registro está referenciado
async fn delete_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((catalog, id)): Path<(String, i32)>,
) -> Result<StatusCode, AppError> {
    let table = writable(&user, &catalog)?;
    CatalogRepository::new(state.pool).delete(table, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
