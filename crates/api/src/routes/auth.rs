//! Authentication routes — registration, login, and profile.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulse_common::error::AppError;
use pulse_common::types::{Role, User};

use crate::middleware::auth::{AuthUser, encode_jwt};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    /// Required when registering as an agent
    pub company_name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
}

/// POST /api/auth/register — Validate, hash the password, create the user.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Validation("Enter a mail".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Enter a password".to_string()));
    }

    let role = Role::parse(&req.role).ok_or_else(|| {
        AppError::Validation(
            "User role must be one of (user, agent, landlord or admin)".to_string(),
        )
    })?;
    if role == Role::Admin {
        return Err(AppError::Auth("Admin sign up not allowed".to_string()));
    }
    if role == Role::Agent && req.company_name.as_deref().unwrap_or("").trim().is_empty() {
        return Err(AppError::Validation(
            "Enter the company name if registering as an agent".to_string(),
        ));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::Validation(
            "User already exists. Login".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, first_name, last_name, email, password, phone_number, role, company_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.first_name.trim())
    .bind(req.last_name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(req.phone_number.as_deref().filter(|p| !p.is_empty()))
    .bind(role.to_string())
    .bind(req.company_name.as_deref().map(str::trim))
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "User registered");

    Ok(Json(user))
}

/// POST /api/auth/login — Verify credentials, return a JWT.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Validation("Enter a mail".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Enter a password".to_string()));
    }

    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, password FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&state.pool)
            .await?;
    let Some((user_id, password_hash)) = row else {
        return Err(AppError::Auth("No user with this mail. Signup".to_string()));
    };

    if !verify_password(&req.password, &password_hash)? {
        return Err(AppError::Auth("Wrong password".to_string()));
    }

    let token = encode_jwt(
        user_id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(user_id = %user_id, "User authenticated");

    Ok(Json(LoginResponse {
        token,
        user_id,
        email,
    }))
}

/// GET /api/auth/me — Profile of the authenticated user.
async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
