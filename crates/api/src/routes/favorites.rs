//! Favorite routes — bookmarked listings for the authenticated user.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::Favorite;
use pulse_engine::favorite::FavoriteService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/favorites", post(create_favorite))
        .route("/api/favorites", get(list_favorites))
}

/// Request body for saving a favorite.
#[derive(Debug, Deserialize)]
pub struct CreateFavoriteRequest {
    pub listing_id: Uuid,
}

/// POST /api/favorites — Bookmark a listing.
async fn create_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateFavoriteRequest>,
) -> Result<Json<Favorite>, AppError> {
    let favorite = FavoriteService::create(&state.pool, auth.user.id, req.listing_id).await?;
    Ok(Json(favorite))
}

/// GET /api/favorites — List the authenticated user's favorites.
async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Favorite>>, AppError> {
    let favorites = FavoriteService::list_by_user(&state.pool, auth.user.id).await?;
    Ok(Json(favorites))
}
