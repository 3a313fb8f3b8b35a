//! Repositorio de licencias de conducir y conductores

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::dto::vehicle_dto::{CreateLicenseRequest, UpdateLicenseRequest};
use crate::models::vehicle::{DriverLicense, LicenseStatus};
use crate::utils::errors::{duplicate_error, not_found_error, validation_error, AppResult};

/// Empleado con su licencia activa, si tiene
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverRow {
    pub employee_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub license_id: Option<i32>,
    pub license_number: Option<String>,
    pub license_type: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub license_status: Option<LicenseStatus>,
}

#[derive(Clone)]
pub struct LicenseRepository {
    pool: PgPool,
}

impl LicenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<DriverLicense>> {
        let licenses = sqlx::query_as::<_, DriverLicense>(
            "SELECT * FROM driver_licenses ORDER BY expires_on DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(licenses)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<DriverLicense> {
        sqlx::query_as::<_, DriverLicense>("SELECT * FROM driver_licenses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found_error("License", id))
    }

    /// Un empleado sólo puede tener una licencia activa
    pub async fn create(
        &self,
        request: CreateLicenseRequest,
        actor: &str,
    ) -> AppResult<DriverLicense> {
        if request.expires_on <= request.issued_on {
            return Err(validation_error(
                "expiresOn",
                "La fecha de vencimiento debe ser posterior a la de emisión",
            ));
        }

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM driver_licenses WHERE employee_id = $1 AND status = 'active')",
        )
        .bind(request.employee_id)
        .fetch_one(&self.pool)
        .await?;
        if has_active {
            return Err(duplicate_error(
                "Active license",
                "employee",
                &request.employee_id.to_string(),
            ));
        }

        let license = sqlx::query_as::<_, DriverLicense>(
            r#"
            INSERT INTO driver_licenses (
                employee_id, license_number, license_type, issued_on, expires_on,
                restrictions, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.employee_id)
        .bind(request.license_number.trim())
        .bind(request.license_type.trim())
        .bind(request.issued_on)
        .bind(request.expires_on)
        .bind(request.restrictions)
        .bind(actor)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("🪪 Licencia {} registrada para empleado {}", license.license_number, license.employee_id);
        Ok(license)
    }

    pub async fn update(&self, id: i32, request: UpdateLicenseRequest) -> AppResult<DriverLicense> {
        let current = self.find_by_id(id).await?;
        let issued_on = request.issued_on.unwrap_or(current.issued_on);
        let expires_on = request.expires_on.unwrap_or(current.expires_on);
        if expires_on <= issued_on {
            return Err(validation_error(
                "expiresOn",
                "La fecha de vencimiento debe ser posterior a la de emisión",
            ));
        }

        let license = sqlx::query_as::<_, DriverLicense>(
            r#"
            UPDATE driver_licenses SET
                license_number = COALESCE($2, license_number),
                license_type = COALESCE($3, license_type),
                issued_on = $4,
                expires_on = $5,
                status = COALESCE($6, status),
                restrictions = COALESCE($7, restrictions)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.license_number)
        .bind(request.license_type)
        .bind(issued_on)
        .bind(expires_on)
        .bind(request.status)
        .bind(request.restrictions)
        .fetch_one(&self.pool)
        .await?;

        Ok(license)
    }

    pub async fn drivers(&self) -> AppResult<Vec<DriverRow>> {
        let drivers = sqlx::query_as::<_, DriverRow>(
            r#"
            SELECT e.id AS employee_id, e.first_name, e.last_name, d.name AS department,
                   l.id AS license_id, l.license_number, l.license_type, l.expires_on,
                   l.status AS license_status
            FROM employees e
            LEFT JOIN departments d ON d.id = e.department_id
            LEFT JOIN driver_licenses l ON l.employee_id = e.id AND l.status = 'active'
            ORDER BY e.last_name, e.first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drivers)
    }
}
