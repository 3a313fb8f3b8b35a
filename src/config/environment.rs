//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Errores al leer la configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Lee una variable opcional con valor por defecto
pub(crate) fn optional_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub log_level: String,
    pub jwt_secret: String,
    /// Vigencia del token en segundos
    pub jwt_expiration: u64,
    /// Vigencia de la sesión en el registro, en segundos
    pub session_ttl: u64,
    pub session_cleanup_interval: u64,
    pub max_login_attempts: i32,
    pub cors_origins: Vec<String>,
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let jwt_expiration: u64 = optional_var("JWT_EXPIRATION", 8 * 60 * 60)?;

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: optional_var("PORT", 3000)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret,
            jwt_expiration,
            session_ttl: optional_var("SESSION_TTL", jwt_expiration)?,
            session_cleanup_interval: optional_var("SESSION_CLEANUP_INTERVAL", 300)?,
            max_login_attempts: optional_var("MAX_LOGIN_ATTEMPTS", 3)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Verificar si estamos en modo desarrollo
    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl EnvironmentConfig {
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiration: 3600,
            session_ttl: 3600,
            session_cleanup_interval: 60,
            max_login_attempts: 3,
            cors_origins: Vec::new(),
        }
    }
}
