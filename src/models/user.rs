//! Modelo de User
//!
//! Usuarios del sistema, su estado de acceso y el historial de login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Estado del usuario - mapea al ENUM user_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Blocked,
}

/// User - mapea a la tabla users
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub employee_id: Option<i32>,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i32,
    pub status: UserStatus,
    pub failed_attempts: i32,
    pub created_at: DateTime<Utc>,
}

/// Vista pública del usuario (sin hash)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub employee_id: Option<i32>,
    pub full_name: String,
    pub email: String,
    pub role_id: i32,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// Resultado de un intento de login para el historial
#[derive(Debug, Clone, Copy, Type, PartialEq, Eq)]
#[sqlx(type_name = "login_outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    BadPassword,
    UnknownEmail,
    Blocked,
    SessionActive,
}
