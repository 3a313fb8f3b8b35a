//! Utilidades del sistema
//!
//! Manejo de errores y validación de entradas.

pub mod errors;
pub mod validation;
