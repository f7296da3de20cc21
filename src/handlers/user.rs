// src/handlers/user.rs
//
// Users exist here only as referential targets for created_by, operator_id
// and dispensed_by; authentication is handled outside this service.

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use crate::dtos::user::{CreateUserRequest, UserResponse};
use crate::error::{map_unique_violation, AppError};
use crate::models::user::User;
use crate::state::AppState;

// POST /users
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("username is required"));
    }

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, role) VALUES ($1, $2) RETURNING id, username, role",
    )
    .bind(&payload.username)
    .bind(&payload.role)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Username already exists"))?;

    info!(user_id = user.id, username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// GET /users
#[instrument(skip(state))]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT id, username, role FROM users ORDER BY username")
        .fetch_all(&state.db_pool)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
