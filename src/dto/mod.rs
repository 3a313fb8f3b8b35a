//! DTOs de la API
//!
//! Requests validados con `validator` y el envoltorio común de respuestas.

pub mod assignment_dto;
pub mod auth_dto;
pub mod reservation_dto;
pub mod room_dto;
pub mod vehicle_dto;

use serde::{Deserialize, Serialize};
use validator::Validate;

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Motivo obligatorio para cancelaciones y bajas
#[derive(Debug, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(
        length(min = 3, max = 500),
        custom = "crate::utils::validation::validate_not_blank"
    )]
    pub reason: String,
}
