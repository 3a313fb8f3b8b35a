use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use validator::Validate;

use crate::dto::auth_dto::{CreateUserRequest, SetModulesRequest};
use crate::dto::ApiResponse;
use crate::models::user::UserSummary;
use crate::repositories::user_repository::UserRepository;
use crate::services::auth_service::{hash_password, validate_modules};
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::normalize_email;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id/modules", put(set_modules))
}

async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, AppError> {
    let users = UserRepository::new(state.pool).list().await?;
    Ok(Json(ApiResponse::success(users)))
}

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserSummary>>), AppError> {
    request.validate()?;
    validate_modules(&request.modules)?;

    let email = normalize_email(&request.email);
    let password_hash = hash_password(request.password).await?;
    let user = UserRepository::new(state.pool)
        .create(
            request.employee_id,
            request.full_name.trim(),
            &email,
            &password_hash,
            request.role_id,
            &request.modules,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(user, "Usuario creado")),
    ))
}

/// Reemplaza los módulos asignados; aplica desde el próximo login
async fn set_modules(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<SetModulesRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    request.validate()?;
    validate_modules(&request.modules)?;
    UserRepository::new(state.pool)
        .set_modules(id, &request.modules)
        .await?;
    Ok(Json(ApiResponse::success_with_message((), "Módulos actualizados")))
}
