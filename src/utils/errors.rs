//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::models::booking::{BookingStatus, ConflictingBooking};

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        conflicts: Vec<ConflictingBooking>,
    },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Invalid license: {0}")]
    InvalidLicense(String),

    #[error("Invalid odometer: end {end} must be greater than start {start}")]
    InvalidOdometer { start: Decimal, end: Decimal },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Resource in use: {0}")]
    ResourceInUse(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Categoría del error, independiente del transporte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    State,
    ResourceInUse,
    Auth,
    Store,
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code.to_string()),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Código SQLSTATE de un error de base de datos, si lo hay
fn sql_state(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const EXCLUSION_VIOLATION: &str = "23P01";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Database(e) => match sql_state(e).as_deref() {
                Some(UNIQUE_VIOLATION) | Some(EXCLUSION_VIOLATION) => ErrorKind::Conflict,
                Some(FOREIGN_KEY_VIOLATION) => ErrorKind::Validation,
                _ => ErrorKind::Store,
            },
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::Unauthorized(_) | AppError::Forbidden(_) | AppError::Jwt(_) => ErrorKind::Auth,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict { .. } | AppError::Duplicate(_) => ErrorKind::Conflict,
            AppError::InvalidTransition { .. }
            | AppError::InvalidLicense(_)
            | AppError::InvalidOdometer { .. }
            | AppError::InvalidState(_) => ErrorKind::State,
            AppError::ResourceInUse(_) => ErrorKind::ResourceInUse,
            AppError::Hash(_) | AppError::Internal(_) => ErrorKind::Store,
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Database(e) => match sql_state(&e).as_deref() {
                Some(UNIQUE_VIOLATION) => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(
                        "Conflict",
                        "A record with the same unique value already exists".to_string(),
                        "DUPLICATE",
                    ),
                ),
                Some(EXCLUSION_VIOLATION) => (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(
                        "Conflict",
                        "The requested window overlaps an existing booking".to_string(),
                        "BOOKING_CONFLICT",
                    ),
                ),
                Some(FOREIGN_KEY_VIOLATION) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(
                        "Validation Error",
                        "A referenced record does not exist".to_string(),
                        "INVALID_REFERENCE",
                    ),
                ),
                _ => {
                    tracing::error!("❌ Error de base de datos: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new(
                            "Database Error",
                            "An error occurred while accessing the database".to_string(),
                            "DB_ERROR",
                        ),
                    )
                }
            },

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    "VALIDATION_ERROR",
                )
                .with_details(json!(e)),
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"),
            ),

            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"),
            ),

            AppError::Jwt(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("JWT Error", msg, "JWT_ERROR"),
            ),

            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("Forbidden", msg, "FORBIDDEN"),
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
            ),

            AppError::Conflict { message, conflicts } => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Conflict", message, "BOOKING_CONFLICT")
                    .with_details(json!({ "conflicts": conflicts })),
            ),

            AppError::Duplicate(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Conflict", msg, "DUPLICATE"),
            ),

            e @ AppError::InvalidTransition { .. } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("State Error", e.to_string(), "INVALID_TRANSITION"),
            ),

            AppError::InvalidLicense(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("State Error", msg, "INVALID_LICENSE"),
            ),

            e @ AppError::InvalidOdometer { .. } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("State Error", e.to_string(), "INVALID_ODOMETER"),
            ),

            AppError::InvalidState(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("State Error", msg, "INVALID_STATE"),
            ),

            AppError::ResourceInUse(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Resource In Use", msg, "RESOURCE_IN_USE"),
            ),

            AppError::Hash(msg) => {
                tracing::error!("❌ Error de hash: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Hash Error",
                        "An error occurred while processing credentials".to_string(),
                        "HASH_ERROR",
                    ),
                )
            }

            AppError::Internal(msg) => {
                tracing::error!("❌ Error interno: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        "INTERNAL_ERROR",
                    ),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind != ErrorKind::Store {
            tracing::debug!("⚠️ Solicitud rechazada ({:?}): {}", kind, self);
        }
        let (status, error_response) = self.status_and_body();
        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());
    error.add_param("field".into(), &field);

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de duplicado
pub fn duplicate_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Duplicate(format!("{} with {} '{}' already exists", resource, field, value))
}
