//! Configuración de base de datos
//!
//! Este módulo maneja la configuración del pool de PostgreSQL con SQLx.

use std::env;
use std::time::Duration;

use super::environment::{optional_var, ConfigError};

/// Configuración de la base de datos
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Límite por statement; al vencer, PostgreSQL aborta y la transacción hace rollback
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            url,
            max_connections: optional_var("DB_MAX_CONNECTIONS", 20)?,
            min_connections: optional_var("DB_MIN_CONNECTIONS", 2)?,
            connect_timeout: Duration::from_secs(optional_var("DB_CONNECT_TIMEOUT", 30)?),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
            statement_timeout: Duration::from_millis(optional_var("DB_STATEMENT_TIMEOUT", 15_000)?),
        })
    }
}
