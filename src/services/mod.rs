//! Services module
//!
//! Lógica de negocio: ciclo de vida de asignaciones y reservas, chequeo
//! de conflictos, autenticación y registro de sesiones.

pub mod assignment_service;
pub mod auth_service;
pub mod calendar;
pub mod conflict_checker;
pub mod fleet_service;
pub mod jwt_service;
pub mod lifecycle;
pub mod reservation_service;
pub mod session_registry;
