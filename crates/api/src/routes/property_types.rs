//! Property-type routes — public catalog, admin-only creation.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use pulse_common::error::AppError;
use pulse_common::types::{PropertyType, Role};
use pulse_engine::property_type::PropertyTypeService;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/property-types", get(list_property_types))
        .route("/api/property-types", post(create_property_type))
        .route("/api/property-types/{name}", get(get_property_type))
}

/// Request body for creating a property type.
#[derive(Debug, Deserialize)]
pub struct CreatePropertyTypeRequest {
    pub name: String,
}

/// GET /api/property-types — The full catalog.
async fn list_property_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<PropertyType>>, AppError> {
    let types = PropertyTypeService::list(&state.pool).await?;
    Ok(Json(types))
}

/// GET /api/property-types/:name — One entry by name.
async fn get_property_type(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PropertyType>, AppError> {
    let property_type = PropertyTypeService::get_by_name(&state.pool, &name).await?;
    Ok(Json(property_type))
}

/// POST /api/property-types — Add to the catalog (admins only).
async fn create_property_type(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreatePropertyTypeRequest>,
) -> Result<Json<PropertyType>, AppError> {
    if auth.user.role != Role::Admin {
        return Err(AppError::Auth(
            "Only admins can create property types".to_string(),
        ));
    }

    let property_type = PropertyTypeService::create(&state.pool, &req.name).await?;
    Ok(Json(property_type))
}
