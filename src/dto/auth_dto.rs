use serde::{Deserialize, Serialize};
use validator::Validate;

// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

/// Datos del usuario que acompañan al token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: i32,
    pub modules: Vec<i32>,
}

// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: SessionUser,
}

impl LoginResponse {
    pub fn bearer(token: String, expires_in: u64, user: SessionUser) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub employee_id: Option<i32>,

    #[validate(length(min = 3, max = 150))]
    pub full_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 100))]
    pub password: String,

    #[validate(range(min = 1))]
    pub role_id: i32,

    #[serde(default)]
    pub modules: Vec<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetModulesRequest {
    #[validate(length(max = 10))]
    pub modules: Vec<i32>,
}
