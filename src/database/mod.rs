//! Módulo de base de datos
//!
//! Maneja la conexión con PostgreSQL y el adaptador transaccional
//! sobre el que trabajan los servicios de reservas.

pub mod connection;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod store;

pub use connection::{create_pool, run_migrations};
pub use postgres::PgStore;
pub use store::{finish, FleetTx, ReservationTx, Store, StoreTx};
