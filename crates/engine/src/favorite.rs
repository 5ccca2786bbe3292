//! Favorites — a user's bookmarked listings.

use sqlx::PgPool;
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::Favorite;

use crate::listing::ListingService;

/// Service layer for favorite operations.
pub struct FavoriteService;

impl FavoriteService {
    /// Bookmark a listing. Saving the same listing twice is a validation
    /// error, not a duplicate row.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Favorite, AppError> {
        // The listing must exist; surfaces a clear error instead of an FK
        // violation.
        ListingService::get(pool, listing_id).await?;

        let result: Result<Favorite, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO favorites (id, user_id, listing_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(listing_id)
        .fetch_one(pool)
        .await;

        match result {
            Ok(favorite) => {
                tracing::info!(
                    favorite_id = %favorite.id,
                    user_id = %user_id,
                    listing_id = %listing_id,
                    "Favorite saved"
                );
                Ok(favorite)
            }
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => Err(
                AppError::Validation("Listing is already in favorites".to_string()),
            ),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// List all favorites for a user.
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Favorite>, AppError> {
        let favorites: Vec<Favorite> =
            sqlx::query_as("SELECT * FROM favorites WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(pool)
                .await?;
        Ok(favorites)
    }
}
