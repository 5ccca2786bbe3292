//! Property-type catalog — the fixed vocabulary listings and alerts refer to.

use sqlx::PgPool;
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::PropertyType;

/// Service layer for property-type operations.
pub struct PropertyTypeService;

impl PropertyTypeService {
    /// Create a new property type. Names are unique.
    pub async fn create(pool: &PgPool, name: &str) -> Result<PropertyType, AppError> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Property type name must not be empty".to_string(),
            ));
        }

        let result: Result<PropertyType, sqlx::Error> = sqlx::query_as(
            "INSERT INTO property_types (id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .fetch_one(pool)
        .await;

        match result {
            Ok(property_type) => {
                tracing::info!(name = %property_type.name, "Property type created");
                Ok(property_type)
            }
            Err(e) if is_unique_violation(&e) => Err(AppError::Validation(format!(
                "Property type '{}' already exists",
                name
            ))),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// List all property types.
    pub async fn list(pool: &PgPool) -> Result<Vec<PropertyType>, AppError> {
        let types: Vec<PropertyType> =
            sqlx::query_as("SELECT * FROM property_types ORDER BY name")
                .fetch_all(pool)
                .await?;
        Ok(types)
    }

    /// Look up a property type by name.
    pub async fn get_by_name(pool: &PgPool, name: &str) -> Result<PropertyType, AppError> {
        let property_type: Option<PropertyType> =
            sqlx::query_as("SELECT * FROM property_types WHERE name = $1")
                .bind(name.trim().to_lowercase())
                .fetch_optional(pool)
                .await?;

        property_type
            .ok_or_else(|| AppError::NotFound(format!("Property type '{}' not found", name)))
    }
}

/// Postgres unique-constraint violation (SQLSTATE 23505).
fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
