use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::assignment_dto::{
    ActivateAssignmentRequest, AssignmentCreated, AssignmentFinalized, CreateAssignmentRequest,
    FinalizeAssignmentRequest, HistoryQuery, StatsQuery, UpdateAssignmentRequest,
};
use crate::dto::{ApiResponse, ReasonRequest};
use crate::models::audit::{AuditRecord, AuditedEntity};
use crate::models::auth::AuthenticatedUser;
use crate::models::vehicle::{Assignment, TripLog};
use crate::repositories::assignment_repository::{
    AssignmentContract, AssignmentDetail, AssignmentRepository, AssignmentSummary, FleetStats,
    HistoryRow,
};
use crate::repositories::audit_repository::AuditRepository;
use crate::state::AppState;
use crate::utils::errors::AppError;

use super::context;

pub fn create_assignment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assignment))
        .route("/active", get(list_active))
        .route("/history", get(history))
        .route("/stats", get(stats))
        .route(
            "/:id",
            get(get_assignment)
                .put(update_assignment)
                .delete(cancel_assignment),
        )
        .route("/:id/authorize", put(authorize_assignment))
        .route("/:id/activate", put(activate_assignment))
        .route("/:id/finalize", put(finalize_assignment))
        .route("/:id/trips", get(list_trips))
        .route("/:id/contract", get(contract))
        .route("/:id/audit", get(audit_trail))
}

async fn create_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssignmentCreated>>), AppError> {
    request.validate()?;
    let created = state.assignments.create(request, &context(&user)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(created, "Asignación creada")),
    ))
}

async fn update_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateAssignmentRequest>,
) -> Result<Json<ApiResponse<Assignment>>, AppError> {
    request.validate()?;
    let assignment = state.assignments.update(id, request, &context(&user)).await?;
    Ok(Json(ApiResponse::success(assignment)))
}

async fn authorize_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Assignment>>, AppError> {
    let assignment = state.assignments.authorize(id, &context(&user)).await?;
    Ok(Json(ApiResponse::success(assignment)))
}

async fn activate_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    request: Option<Json<ActivateAssignmentRequest>>,
) -> Result<Json<ApiResponse<Assignment>>, AppError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    request.validate()?;
    let assignment = state
        .assignments
        .activate(id, request.start_odometer, &context(&user))
        .await?;
    Ok(Json(ApiResponse::success(assignment)))
}

async fn finalize_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<FinalizeAssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentFinalized>>, AppError> {
    request.validate()?;
    let finalized = state.assignments.finalize(id, request, &context(&user)).await?;
    Ok(Json(ApiResponse::success_with_message(finalized, "Asignación finalizada")))
}

async fn cancel_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<ApiResponse<Assignment>>, AppError> {
    request.validate()?;
    let assignment = state
        .assignments
        .cancel(id, request.reason, &context(&user))
        .await?;
    Ok(Json(ApiResponse::success_with_message(assignment, "Asignación cancelada")))
}

async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AssignmentSummary>>>, AppError> {
    let rows = AssignmentRepository::new(state.pool).active().await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AssignmentDetail>>, AppError> {
    let detail = AssignmentRepository::new(state.pool).detail(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn list_trips(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<TripLog>>>, AppError> {
    let trips = AssignmentRepository::new(state.pool).trips(id).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryRow>>>, AppError> {
    let rows = AssignmentRepository::new(state.pool).history(&query).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<FleetStats>>, AppError> {
    query.validate()?;
    let stats = AssignmentRepository::new(state.pool).stats(&query).await?;
    Ok(Json(ApiResponse::success(stats)))
}

async fn contract(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AssignmentContract>>, AppError> {
    let contract = AssignmentRepository::new(state.pool).contract(id).await?;
    Ok(Json(ApiResponse::success(contract)))
}

async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<AuditRecord>>>, AppError> {
    let rows = AuditRepository::new(state.pool)
        .trail(AuditedEntity::Assignment, id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
