//! Servicio de autenticación
//!
//! Verifica credenciales con bcrypt, bloquea la cuenta tras varios
//! intentos fallidos, abre la sesión en el registro y emite el JWT.
//! Cada intento queda en el historial de accesos.

use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};

use crate::dto::auth_dto::{LoginRequest, LoginResponse, SessionUser};
use crate::models::auth::Module;
use crate::models::user::{LoginOutcome, User, UserStatus};
use crate::services::jwt_service::JwtService;
use crate::services::session_registry::SessionRegistry;
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::normalize_email;

/// Acceso a usuarios que necesita el login
#[async_trait]
pub trait UserDirectory: Clone + Send + Sync + 'static {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn modules_for(&self, user_id: i32) -> AppResult<Vec<i32>>;

    /// Incrementa y devuelve el contador de intentos fallidos
    async fn record_failure(&self, user_id: i32) -> AppResult<i32>;

    async fn block(&self, user_id: i32) -> AppResult<()>;

    async fn reset_failures(&self, user_id: i32) -> AppResult<()>;

    async fn log_attempt(
        &self,
        user_id: Option<i32>,
        email: &str,
        outcome: LoginOutcome,
    ) -> AppResult<()>;
}

/// Hash bcrypt fuera del runtime async
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
        .map_err(|e| AppError::Hash(e.to_string()))
}

/// Todos los ids deben corresponder a un módulo conocido
pub fn validate_modules(modules: &[i32]) -> AppResult<()> {
    if modules.iter().all(|id| Module::from_id(*id).is_some()) {
        Ok(())
    } else {
        Err(validation_error("modules", "Módulo desconocido"))
    }
}

#[derive(Clone)]
pub struct AuthService<U: UserDirectory> {
    users: U,
    sessions: SessionRegistry,
    jwt: JwtService,
    max_attempts: i32,
}

impl<U: UserDirectory> AuthService<U> {
    pub fn new(users: U, sessions: SessionRegistry, jwt: JwtService, max_attempts: i32) -> Self {
        Self {
            users,
            sessions,
            jwt,
            max_attempts,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let email = normalize_email(&request.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.users
                .log_attempt(None, &email, LoginOutcome::UnknownEmail)
                .await?;
            tracing::warn!("🚷 Login con email desconocido: {}", email);
            return Err(AppError::Unauthorized("Credenciales inválidas".to_string()));
        };

        if user.status != UserStatus::Active {
            self.users
                .log_attempt(Some(user.id), &email, LoginOutcome::Blocked)
                .await?;
            return Err(AppError::Forbidden(match user.status {
                UserStatus::Blocked => "Usuario bloqueado".to_string(),
                _ => "Usuario inactivo".to_string(),
            }));
        }

        let password = request.password;
        let stored_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify(password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?
            .map_err(|e| AppError::Hash(e.to_string()))?;

        if !matches {
            return Err(self.reject_password(&user, &email).await?);
        }

        let session = match self.sessions.open(user.id, &email).await {
            Ok(session) => session,
            Err(error) => {
                self.users
                    .log_attempt(Some(user.id), &email, LoginOutcome::SessionActive)
                    .await?;
                return Err(error);
            }
        };

        let issued = async {
            self.users.reset_failures(user.id).await?;
            let modules = self.users.modules_for(user.id).await?;
            let token = self.jwt.generate_token(&user, &modules, &session)?;
            Ok::<_, AppError>((modules, token))
        }
        .await;
        let (modules, token) = match issued {
            Ok(issued) => issued,
            Err(error) => {
                self.sessions.close(user.id, &session.session_id).await;
                return Err(error);
            }
        };

        self.users
            .log_attempt(Some(user.id), &email, LoginOutcome::Success)
            .await?;
        tracing::info!("✅ Login exitoso: {}", email);

        Ok(LoginResponse::bearer(
            token,
            self.jwt.expires_in(),
            SessionUser {
                id: user.id,
                name: user.full_name,
                email: user.email,
                role: user.role_id,
                modules,
            },
        ))
    }

    /// Cuenta el fallo y bloquea al llegar al máximo de intentos
    async fn reject_password(&self, user: &User, email: &str) -> AppResult<AppError> {
        let attempts = self.users.record_failure(user.id).await?;
        self.users
            .log_attempt(Some(user.id), email, LoginOutcome::BadPassword)
            .await?;

        if attempts >= self.max_attempts {
            self.users.block(user.id).await?;
            tracing::warn!("🔒 Usuario {} bloqueado tras {} intentos", email, attempts);
            return Ok(AppError::Forbidden(
                "Usuario bloqueado por intentos fallidos".to_string(),
            ));
        }

        tracing::warn!("⚠️ Contraseña incorrecta para {} ({}/{})", email, attempts, self.max_attempts);
        Ok(AppError::Unauthorized("Credenciales inválidas".to_string()))
    }

    pub async fn logout(&self, user_id: i32, session_id: &str) -> AppResult<()> {
        if self.sessions.close(user_id, session_id).await {
            tracing::info!("👋 Sesión cerrada para usuario {}", user_id);
            Ok(())
        } else {
            Err(AppError::Unauthorized("La sesión ya no está activa".to_string()))
        }
    }
}
