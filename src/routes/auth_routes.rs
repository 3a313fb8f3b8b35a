use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse, SessionUser};
use crate::dto::ApiResponse;
use crate::middleware::{require_session, AuthGate};
use crate::models::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Login es público; logout y perfil exigen sesión viva
pub fn create_auth_router(gate: AuthGate) -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(gate, require_session))
        .route("/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    request.validate()?;
    let response = state.auth.login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.auth.logout(user.user_id, &user.session_id).await?;
    Ok(Json(ApiResponse::success_with_message((), "Sesión cerrada")))
}

async fn me(Extension(user): Extension<AuthenticatedUser>) -> Json<ApiResponse<SessionUser>> {
    Json(ApiResponse::success(SessionUser {
        id: user.user_id,
        name: user.name,
        email: user.email,
        role: user.role,
        modules: user.modules,
    }))
}
