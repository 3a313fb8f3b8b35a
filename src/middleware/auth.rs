//! Middleware de autenticación JWT
//!
//! Extrae el bearer token, valida firma y expiración, confirma que la
//! sesión siga viva en el registro y exige el módulo de la ruta.
//! Inyecta `AuthenticatedUser` en las extensions del request.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::models::auth::{AuthenticatedUser, JwtClaims, Module};
use crate::services::jwt_service::JwtService;
use crate::services::session_registry::SessionRegistry;
use crate::utils::errors::{AppError, AppResult};

/// Lo necesario para validar un request: firma del token y sesión viva
#[derive(Clone)]
pub struct AuthGate {
    pub jwt: JwtService,
    pub sessions: SessionRegistry,
}

impl AuthGate {
    pub fn new(jwt: JwtService, sessions: SessionRegistry) -> Self {
        Self { jwt, sessions }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> AppResult<JwtClaims> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Token de autorización requerido".to_string()))?;

        let claims = self.jwt.validate_token(token.trim())?;
        if !self.sessions.is_active(claims.sub, &claims.jti).await {
            return Err(AppError::Unauthorized(
                "La sesión expiró o fue cerrada".to_string(),
            ));
        }
        Ok(claims)
    }
}

/// Sólo exige sesión válida (logout, perfil)
pub async fn require_session(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = gate.authenticate(request.headers()).await?;
    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));
    Ok(next.run(request).await)
}

/// Exige sesión válida y el módulo indicado
pub async fn require_module(
    State((gate, module)): State<(AuthGate, Module)>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = gate.authenticate(request.headers()).await?;
    if !claims.has_module(module) {
        tracing::warn!("🚫 {} sin acceso al módulo {}", claims.email, module);
        return Err(AppError::Forbidden(format!(
            "Sin acceso al módulo {}",
            module
        )));
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentConfig;
    use crate::services::jwt_service::tests::user;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.actor()
    }

    fn gate() -> AuthGate {
        let config = EnvironmentConfig::for_tests();
        AuthGate::new(JwtService::new(&config), SessionRegistry::new(config.session_ttl))
    }

    fn app(gate: AuthGate) -> Router {
        Router::new()
            .route("/fleet", get(whoami))
            .route_layer(middleware::from_fn_with_state(
                (gate, Module::Fleet),
                require_module,
            ))
    }

    async fn token_for(gate: &AuthGate, modules: &[i32]) -> String {
        let session = gate.sessions.open(1, "ana@empresa.com").await.unwrap();
        gate.jwt.generate_token(&user(1), modules, &session).unwrap()
    }

    fn request(token: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/fleet");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let response = app(gate()).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_with_module_reaches_handler() {
        let gate = gate();
        let token = token_for(&gate, &[Module::Fleet.id()]).await;

        let response = app(gate).oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ana@empresa.com");
    }

    #[tokio::test]
    async fn token_without_module_is_forbidden() {
        let gate = gate();
        let token = token_for(&gate, &[Module::Rooms.id()]).await;

        let response = app(gate).oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn closed_session_invalidates_token() {
        let gate = gate();
        let token = token_for(&gate, &[Module::Fleet.id()]).await;
        let claims = gate.jwt.validate_token(&token).unwrap();
        gate.sessions.close(claims.sub, &claims.jti).await;

        let response = app(gate).oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
