//! Middleware del sistema
//!
//! Autenticación por módulo y CORS.

pub mod auth;
pub mod cors;

pub use auth::{require_module, require_session, AuthGate};
pub use cors::cors_layer;
