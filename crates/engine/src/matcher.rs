//! Alert matcher — evaluates a new listing against saved alerts.
//!
//! An alert matches when its location equals the listing's (case-insensitive),
//! its property type is the listing's, and its [min, max] price band contains
//! the listing price.

use sqlx::PgPool;

use pulse_common::error::AppError;
use pulse_common::types::{Alert, Listing};

/// Matches incoming listings against saved alerts.
pub struct AlertMatcher;

impl AlertMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Find all alerts matching the listing. The SQL predicate mirrors
    /// [`AlertMatcher::matches`].
    pub async fn find_matching_alerts(
        &self,
        listing: &Listing,
        pool: &PgPool,
    ) -> Result<Vec<Alert>, AppError> {
        let alerts: Vec<Alert> = sqlx::query_as(
            r#"
            SELECT *
            FROM alerts
            WHERE LOWER(location) = LOWER($1)
              AND property_type_id = $2
              AND min_price <= $3
              AND max_price >= $3
            "#,
        )
        .bind(&listing.location)
        .bind(listing.property_type_id)
        .bind(listing.price)
        .fetch_all(pool)
        .await?;

        Ok(alerts)
    }

    /// Evaluate a single alert against a listing.
    pub fn matches(alert: &Alert, listing: &Listing) -> bool {
        alert.location.eq_ignore_ascii_case(&listing.location)
            && alert.property_type_id == listing.property_type_id
            && alert.min_price <= listing.price
            && alert.max_price >= listing.price
    }
}

impl Default for AlertMatcher {
    fn default() -> Self {
        Self::new()
    }
}
