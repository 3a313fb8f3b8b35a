//! Repositorios de lectura y CRUD directo sobre PostgreSQL
//!
//! Las operaciones con ciclo de vida pasan por los servicios.

pub mod assignment_repository;
pub mod audit_repository;
pub mod catalog_repository;
pub mod license_repository;
pub mod reservation_repository;
pub mod room_repository;
pub mod user_repository;
pub mod vehicle_repository;
