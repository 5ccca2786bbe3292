//! Listing service — CRUD plus the filtered search behind `GET /api/listings`.

use sqlx::PgPool;
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::{Listing, ListingStatus};

use crate::property_type::PropertyTypeService;

/// Listings returned per page when the caller does not say otherwise.
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Service layer for listing operations.
pub struct ListingService;

/// Parameters for creating a new listing.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateListingParams {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub location: String,
    /// Property type by name, resolved against the catalog
    pub property_type: String,
    pub images: serde_json::Value,
}

/// Search filters for listing queries. Absent fields mean "no constraint".
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ListingFilter {
    pub location: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListingService {
    /// Create a listing for an agent. New listings start `active` and
    /// unverified.
    pub async fn create(
        pool: &PgPool,
        agent_id: Uuid,
        params: &CreateListingParams,
    ) -> Result<Listing, AppError> {
        Self::validate_create(params)?;

        let property_type = PropertyTypeService::get_by_name(pool, &params.property_type)
            .await
            .map_err(|_| {
                AppError::Validation(format!(
                    "Unknown property type '{}'",
                    params.property_type
                ))
            })?;

        let listing: Listing = sqlx::query_as(
            r#"
            INSERT INTO listings (id, agent_id, title, description, price, location, property_type_id, verified, images, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, false, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(agent_id)
        .bind(params.title.trim())
        .bind(params.description.trim())
        .bind(params.price)
        .bind(params.location.trim())
        .bind(property_type.id)
        .bind(&params.images)
        .bind(ListingStatus::Active.to_string())
        .fetch_one(pool)
        .await?;

        tracing::info!(
            listing_id = %listing.id,
            agent_id = %agent_id,
            location = %listing.location,
            price = listing.price,
            "Listing created"
        );

        Ok(listing)
    }

    /// Get a single listing by ID.
    pub async fn get(pool: &PgPool, listing_id: Uuid) -> Result<Listing, AppError> {
        let listing: Option<Listing> = sqlx::query_as("SELECT * FROM listings WHERE id = $1")
            .bind(listing_id)
            .fetch_optional(pool)
            .await?;

        listing.ok_or_else(|| AppError::NotFound(format!("Listing {} not found", listing_id)))
    }

    /// List active listings matching the filter, newest first, paginated.
    pub async fn list(pool: &PgPool, filter: &ListingFilter) -> Result<Vec<Listing>, AppError> {
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
        let offset = (filter.page.unwrap_or(1).max(1) - 1) * limit;

        let listings: Vec<Listing> = sqlx::query_as(
            r#"
            SELECT l.*
            FROM listings l
            JOIN property_types pt ON l.property_type_id = pt.id
            WHERE l.status = 'active'
              AND ($1::text IS NULL OR l.location ILIKE $1)
              AND ($2::text IS NULL OR pt.name = $2)
              AND ($3::bigint IS NULL OR l.price >= $3)
              AND ($4::bigint IS NULL OR l.price <= $4)
            ORDER BY l.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.location.as_deref())
        .bind(
            filter
                .property_type
                .as_deref()
                .map(|name| name.trim().to_lowercase()),
        )
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(listings)
    }

    fn validate_create(params: &CreateListingParams) -> Result<(), AppError> {
        if params.title.trim().is_empty() {
            return Err(AppError::Validation("Enter the listing title".to_string()));
        }
        if params.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Enter the listing description".to_string(),
            ));
        }
        if params.location.trim().is_empty() {
            return Err(AppError::Validation(
                "Enter the listing location".to_string(),
            ));
        }
        if params.property_type.trim().is_empty() {
            return Err(AppError::Validation(
                "Enter the listing property type".to_string(),
            ));
        }
        if params.price <= 0 {
            return Err(AppError::Validation(
                "Listing price must be positive".to_string(),
            ));
        }

        let images_empty = match &params.images {
            serde_json::Value::Array(images) => images.is_empty(),
            serde_json::Value::Null => true,
            _ => false,
        };
        if images_empty {
            return Err(AppError::Validation(
                "Enter the listing images".to_string(),
            ));
        }

        Ok(())
    }
}
