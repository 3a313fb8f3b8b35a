use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::reservation_dto::{
    OverlapQuery, PaymentRegistered, PaymentRequest, RequesterSearchQuery, ReservationFilters,
    ReservationRequest, ReservationSaved, StatusChangeRequest,
};
use crate::dto::{ApiResponse, ReasonRequest};
use crate::models::audit::{AuditRecord, AuditedEntity};
use crate::models::auth::AuthenticatedUser;
use crate::models::reservation::{ExternalRequester, Payment, Reservation};
use crate::repositories::audit_repository::AuditRepository;
use crate::repositories::reservation_repository::{
    ReservationContract, ReservationDetail, ReservationRepository, ReservationSummary,
};
use crate::services::calendar::{self, CalendarEvent};
use crate::services::conflict_checker::ConflictReport;
use crate::state::AppState;
use crate::utils::errors::AppError;

use super::context;

pub fn create_reservation_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reservations).post(create_reservation))
        .route("/calendar", get(calendar_events))
        .route("/check-overlap", get(check_overlap))
        .route("/requesters", get(search_requesters))
        .route(
            "/:id",
            get(get_reservation)
                .put(update_reservation)
                .delete(cancel_reservation),
        )
        .route("/:id/status", put(change_status))
        .route("/:id/payment", post(register_payment).get(get_payment))
        .route("/:id/contract", get(contract))
        .route("/:id/audit", get(audit_trail))
}

async fn list_reservations(
    State(state): State<AppState>,
    Query(filters): Query<ReservationFilters>,
) -> Result<Json<ApiResponse<Vec<ReservationSummary>>>, AppError> {
    let rows = ReservationRepository::new(state.pool).list(&filters).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn create_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationSaved>>), AppError> {
    request.validate()?;
    let saved = state.reservations.create(request, &context(&user)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(saved, "Reserva registrada")),
    ))
}

/// Eventos para el calendario; excluye reservas canceladas y finalizadas
async fn calendar_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CalendarEvent>>>, AppError> {
    let rows = ReservationRepository::new(state.pool).calendar_rows().await?;
    Ok(Json(ApiResponse::success(calendar::project(rows))))
}

async fn check_overlap(
    State(state): State<AppState>,
    Query(query): Query<OverlapQuery>,
) -> Result<Json<ApiResponse<ConflictReport>>, AppError> {
    let report = state.reservations.check_overlap(query).await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn search_requesters(
    State(state): State<AppState>,
    Query(query): Query<RequesterSearchQuery>,
) -> Result<Json<ApiResponse<Vec<ExternalRequester>>>, AppError> {
    query.validate()?;
    let rows = ReservationRepository::new(state.pool)
        .search_requesters(query.q.trim())
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDetail>>, AppError> {
    let detail = ReservationRepository::new(state.pool).detail(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn update_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<ReservationRequest>,
) -> Result<Json<ApiResponse<ReservationSaved>>, AppError> {
    request.validate()?;
    let saved = state.reservations.update(id, request, &context(&user)).await?;
    Ok(Json(ApiResponse::success(saved)))
}

async fn change_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<ApiResponse<Reservation>>, AppError> {
    request.validate()?;
    let reservation = state
        .reservations
        .set_status(id, request, &context(&user))
        .await?;
    Ok(Json(ApiResponse::success(reservation)))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<ApiResponse<Reservation>>, AppError> {
    request.validate()?;
    let reservation = state
        .reservations
        .cancel(id, request.reason, &context(&user))
        .await?;
    Ok(Json(ApiResponse::success_with_message(reservation, "Reserva cancelada")))
}

/// El pago autoriza la reserva
async fn register_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentRegistered>>), AppError> {
    request.validate()?;
    let registered = state
        .reservations
        .register_payment(id, request, &context(&user))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(registered))))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Option<Payment>>>, AppError> {
    let payment = ReservationRepository::new(state.pool).payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

async fn contract(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationContract>>, AppError> {
    let contract = ReservationRepository::new(state.pool).contract(id).await?;
    Ok(Json(ApiResponse::success(contract)))
}

/// Cambios de fecha, horario y nombre con su motivo
async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<AuditRecord>>>, AppError> {
    let rows = AuditRepository::new(state.pool)
        .trail(AuditedEntity::Reservation, id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
