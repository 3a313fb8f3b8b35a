//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos que usan los DTOs.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

/// Validar y convertir string a tiempo. Acepta `HH:MM` y `HH:MM:SS`.
pub fn parse_time(value: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| {
            let mut error = ValidationError::new("time");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"HH:MM[:SS]".to_string());
            error
        })
}

/// Normaliza `HH:MM` a `HH:MM:00`
pub fn normalize_time(value: &str) -> Result<String, ValidationError> {
    parse_time(value).map(|time| time.format("%H:%M:%S").to_string())
}

/// Validar y convertir string a fecha
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let mut error = ValidationError::new("date");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"YYYY-MM-DD".to_string());
        error
    })
}

/// `deserialize_with` para horas de evento
pub fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).map_err(|_| serde::de::Error::custom(format!("hora inválida: {}", raw)))
}

pub fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_time(&raw)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("hora inválida: {}", raw))),
        _ => Ok(None),
    }
}

/// Validar que un string no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

/// Montos y lecturas de odómetro no pueden ser negativos
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Búsquedas de texto libre requieren al menos 3 caracteres
pub fn validate_search_term(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() < 3 {
        let mut error = ValidationError::new("search_term");
        error.add_param("min".into(), &3);
        return Err(error);
    }
    Ok(())
}

/// Id de catálogo recibido como número o como string numérico
pub fn parse_catalog_id(value: &serde_json::Value) -> Option<i32> {
    let id = match value {
        serde_json::Value::Number(number) => number.as_i64()?,
        serde_json::Value::String(text) => text.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(id).ok().filter(|id| *id > 0)
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
