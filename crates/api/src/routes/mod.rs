pub mod alerts;
pub mod auth;
pub mod favorites;
pub mod health;
pub mod listings;
pub mod property_types;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(listings::router())
        .merge(alerts::router())
        .merge(favorites::router())
        .merge(property_types::router())
        .with_state(state)
}
