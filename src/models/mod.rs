//! Modelos de datos
//!
//! Este módulo contiene las entidades del dominio de flota y salones
//! y su mapeo a las tablas de PostgreSQL.

pub mod audit;
pub mod auth;
pub mod booking;
pub mod catalog;
pub mod reservation;
pub mod room;
pub mod user;
pub mod vehicle;
