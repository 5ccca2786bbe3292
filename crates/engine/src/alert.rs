//! Alert service — saved searches that feed the notification pipeline.

use sqlx::PgPool;
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::{Alert, ContactMethod};

use crate::property_type::PropertyTypeService;

/// Service layer for alert operations.
pub struct AlertService;

/// Parameters for creating a new alert.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateAlertParams {
    pub min_price: i64,
    pub max_price: i64,
    pub location: String,
    /// Property type by name, resolved against the catalog
    pub property_type: String,
    pub contact_method: String,
}

impl AlertService {
    /// Create an alert for a user.
    ///
    /// The contact method is validated here, at the producer boundary, so the
    /// dispatcher only ever sees recognized methods from this code path.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        params: &CreateAlertParams,
    ) -> Result<Alert, AppError> {
        if params.location.trim().is_empty() {
            return Err(AppError::Validation("Enter the alert location".to_string()));
        }
        if params.min_price <= 0 || params.max_price <= 0 {
            return Err(AppError::Validation(
                "Alert prices must be positive".to_string(),
            ));
        }
        if params.min_price > params.max_price {
            return Err(AppError::Validation(
                "min_price must not exceed max_price".to_string(),
            ));
        }
        let contact_method = ContactMethod::parse(&params.contact_method).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid contact_method '{}'. Valid methods: email, sms, whatsapp",
                params.contact_method
            ))
        })?;

        let property_type = PropertyTypeService::get_by_name(pool, &params.property_type)
            .await
            .map_err(|_| {
                AppError::Validation(format!(
                    "Unknown property type '{}'",
                    params.property_type
                ))
            })?;

        let alert: Alert = sqlx::query_as(
            r#"
            INSERT INTO alerts (id, user_id, min_price, max_price, location, property_type_id, contact_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(params.min_price)
        .bind(params.max_price)
        .bind(params.location.trim())
        .bind(property_type.id)
        .bind(contact_method.to_string())
        .fetch_one(pool)
        .await?;

        tracing::info!(
            alert_id = %alert.id,
            user_id = %user_id,
            location = %alert.location,
            contact_method = %alert.contact_method,
            "Alert created"
        );

        Ok(alert)
    }

    /// List all alerts for a user, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Alert>, AppError> {
        let alerts: Vec<Alert> =
            sqlx::query_as("SELECT * FROM alerts WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(pool)
                .await?;
        Ok(alerts)
    }
}
