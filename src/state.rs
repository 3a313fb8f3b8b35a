//! Estado compartido de la aplicación
//!
//! Se pasa a través del router de Axum. Los servicios de reservas se
//! construyen sobre `PgStore`; las lecturas usan el pool directamente.

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::database::PgStore;
use crate::middleware::AuthGate;
use crate::repositories::user_repository::UserRepository;
use crate::services::{
    assignment_service::AssignmentService, auth_service::AuthService,
    fleet_service::FleetService, jwt_service::JwtService,
    reservation_service::ReservationService, session_registry::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub sessions: SessionRegistry,
    pub jwt: JwtService,
    pub assignments: AssignmentService<PgStore>,
    pub reservations: ReservationService<PgStore>,
    pub fleet: FleetService<PgStore>,
    pub auth: AuthService<UserRepository>,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        let store = PgStore::new(pool.clone());
        let sessions = SessionRegistry::new(config.session_ttl);
        let jwt = JwtService::new(&config);
        let auth = AuthService::new(
            UserRepository::new(pool.clone()),
            sessions.clone(),
            jwt.clone(),
            config.max_login_attempts,
        );

        Self {
            assignments: AssignmentService::new(store.clone()),
            reservations: ReservationService::new(store.clone()),
            fleet: FleetService::new(store),
            auth,
            pool,
            config,
            sessions,
            jwt,
        }
    }

    /// Limpiar sesiones expiradas
    pub async fn cleanup_expired_sessions(&self) {
        let removed = self.sessions.cleanup_expired().await;
        if removed > 0 {
            tracing::info!("🧹 {} sesiones expiradas eliminadas", removed);
        }
    }
}

impl FromRef<AppState> for AuthGate {
    fn from_ref(state: &AppState) -> Self {
        AuthGate::new(state.jwt.clone(), state.sessions.clone())
    }
}
