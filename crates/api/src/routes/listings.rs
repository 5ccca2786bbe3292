//! Listing routes — public search plus agent-only creation.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::{Listing, Role};
use pulse_engine::listing::{CreateListingParams, ListingFilter, ListingService};
use pulse_engine::producer::NotificationProducer;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/listings", get(list_listings))
        .route("/api/listings", post(create_listing))
        .route("/api/listings/{id}", get(get_listing))
}

/// GET /api/listings — Filterable, paginated listing search.
async fn list_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let listings = ListingService::list(&state.pool, &filter).await?;
    Ok(Json(listings))
}

/// GET /api/listings/:id — A single listing.
async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Listing>, AppError> {
    let listing = ListingService::get(&state.pool, id).await?;
    Ok(Json(listing))
}

/// POST /api/listings — Create a listing (agents only) and fan matching
/// alerts out into queued notifications.
async fn create_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(params): Json<CreateListingParams>,
) -> Result<Json<Listing>, AppError> {
    if auth.user.role != Role::Agent {
        return Err(AppError::Auth("User is not an agent".to_string()));
    }

    let listing = ListingService::create(&state.pool, auth.user.id, &params).await?;

    // Notification fan-out is a side effect of publishing; its failure is an
    // operational event, not a reason to fail the request.
    match NotificationProducer::new()
        .fan_out(&listing, &state.pool, &state.queue)
        .await
    {
        Ok(queued) if queued > 0 => {
            tracing::info!(listing_id = %listing.id, queued, "Alert notifications queued");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(listing_id = %listing.id, error = %e, "Notification fan-out failed");
        }
    }

    Ok(Json(listing))
}
