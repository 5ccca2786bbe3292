//! Alert routes — saved searches for the authenticated user.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use pulse_common::error::AppError;
use pulse_common::types::Alert;
use pulse_engine::alert::{AlertService, CreateAlertParams};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/alerts", post(create_alert))
        .route("/api/alerts", get(list_alerts))
}

/// POST /api/alerts — Create a new alert.
async fn create_alert(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(params): Json<CreateAlertParams>,
) -> Result<Json<Alert>, AppError> {
    let alert = AlertService::create(&state.pool, auth.user.id, &params).await?;
    Ok(Json(alert))
}

/// GET /api/alerts — List the authenticated user's alerts.
async fn list_alerts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = AlertService::list_by_user(&state.pool, auth.user.id).await?;
    Ok(Json(alerts))
}
