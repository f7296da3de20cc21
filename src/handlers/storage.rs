// src/handlers/storage.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::dtos::storage::{BucketResponse, CreateBucketRequest};
use crate::error::{map_unique_violation, AppError};
use crate::models::storage::StorageBucket;
use crate::state::AppState;

const BUCKET_COLUMNS: &str = "id, bucket_code, description, capacity::FLOAT8 AS capacity";

// POST /storage_buckets
#[instrument(skip(state, payload))]
pub async fn create_bucket(
    State(state): State<AppState>,
    Json(payload): Json<CreateBucketRequest>,
) -> Result<(StatusCode, Json<BucketResponse>), AppError> {
    if payload.bucket_code.trim().is_empty() {
        return Err(AppError::validation("bucket_code is required"));
    }
    if let Some(capacity) = payload.capacity {
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(AppError::validation("capacity must be a positive number"));
        }
    }

    let bucket = sqlx::query_as::<_, StorageBucket>(&format!(
        "INSERT INTO storage_buckets (bucket_code, description, capacity)
         VALUES ($1, $2, $3)
         RETURNING {BUCKET_COLUMNS}"
    ))
    .bind(&payload.bucket_code)
    .bind(&payload.description)
    .bind(payload.capacity)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Bucket code already exists"))?;

    info!(bucket_id = bucket.id, bucket_code = %bucket.bucket_code, "storage bucket created");
    Ok((StatusCode::CREATED, Json(BucketResponse::from(bucket))))
}

// GET /storage_buckets
#[instrument(skip(state))]
pub async fn get_buckets(
    State(state): State<AppState>,
) -> Result<Json<Vec<BucketResponse>>, AppError> {
    let buckets = sqlx::query_as::<_, StorageBucket>(&format!(
        "SELECT {BUCKET_COLUMNS} FROM storage_buckets ORDER BY bucket_code"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(buckets.into_iter().map(BucketResponse::from).collect()))
}

// GET /storage_buckets/:id
#[instrument(skip(state), fields(id))]
pub async fn get_bucket(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<BucketResponse>, AppError> {
    let bucket = sqlx::query_as::<_, StorageBucket>(&format!(
        "SELECT {BUCKET_COLUMNS} FROM storage_buckets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Storage bucket not found"))?;

    Ok(Json(BucketResponse::from(bucket)))
}
