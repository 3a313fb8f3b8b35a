//! Registro de sesiones activas
//!
//! Una sesión viva por usuario. El `jti` del token debe coincidir con la
//! sesión registrada; al cerrar sesión o vencer el TTL el token deja de
//! servir aunque su firma siga siendo válida.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Session {
    pub session_id: String,
    pub user_id: i32,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<i32, Session>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Abre una sesión; falla si el usuario ya tiene una viva
    pub async fn open(&self, user_id: i32, email: &str) -> AppResult<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&user_id) {
            if !existing.is_expired() {
                tracing::warn!("🔒 Usuario {} ya tiene una sesión activa", email);
                return Err(AppError::Forbidden(
                    "El usuario ya tiene una sesión activa".to_string(),
                ));
            }
        }

        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            user_id,
            email: email.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        sessions.insert(user_id, session.clone());
        tracing::info!("🔑 Sesión abierta para {} (total: {})", email, sessions.len());
        Ok(session)
    }

    /// La sesión existe, no venció y corresponde al token presentado
    pub async fn is_active(&self, user_id: i32, session_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(&user_id)
            .map(|s| s.session_id == session_id && !s.is_expired())
            .unwrap_or(false)
    }

    pub async fn close(&self, user_id: i32, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&user_id) {
            Some(session) if session.session_id == session_id => {
                sessions.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    /// Limpiar sesiones expiradas
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
