// src/handlers/scale.rs
//
// Device-facing operations. Captures serialize per dosing record: the
// record's lock is held across read-compute-write so two concurrent capture
// requests cannot interleave their actual/margin/status writes.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument, warn};

use crate::dosing::{self, DosingAttempt, DosingSnapshot, DEFAULT_TOLERANCE};
use crate::dtos::scale::{CaptureResponse, NetWeightResponse, StartDosingResponse};
use crate::error::AppError;
use crate::models::recipe::{RecipeMaterial, RecipeMaterialStatus};
use crate::state::AppState;

const RECIPE_MATERIAL_COLUMNS: &str = "id, recipe_id, material_id, bucket_id,
    set_point::FLOAT8 AS set_point, actual::FLOAT8 AS actual,
    margin::FLOAT8 AS margin, status";

pub(crate) async fn fetch_recipe_material(
    pool: &sqlx::PgPool,
    id: i64,
) -> Result<RecipeMaterial, AppError> {
    sqlx::query_as::<_, RecipeMaterial>(&format!(
        "SELECT {RECIPE_MATERIAL_COLUMNS} FROM recipe_materials WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Recipe material with ID {} not found", id)))
}

/// True once every dosing record of the recipe reports `created`.
async fn recipe_complete(pool: &sqlx::PgPool, recipe_id: i64) -> Result<bool, AppError> {
    let remaining: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recipe_materials WHERE recipe_id = $1 AND status <> 'created'",
    )
    .bind(recipe_id)
    .fetch_one(pool)
    .await?;
    Ok(remaining == 0)
}

/// Core capture path shared by /scale/capture and
/// /recipe_materials/{id}/capture_weight.
pub(crate) async fn capture_for_record(
    state: &AppState,
    recipe_material_id: i64,
) -> Result<CaptureResponse, AppError> {
    let _guard = state.dosing_locks.acquire(recipe_material_id).await;

    let record = fetch_recipe_material(&state.db_pool, recipe_material_id).await?;

    // Device read happens before any mutation; a failed read yields no plan
    // and the record is left exactly as it was.
    let plan = dosing::plan_capture_read(
        DosingSnapshot {
            set_point: record.set_point.unwrap_or(0.0),
            status: record.status,
        },
        state.scale.read_net_weight().await,
        state.policy,
    )?;

    // One statement: actual, margin and status land together or not at all.
    sqlx::query("UPDATE recipe_materials SET actual = $1, margin = $2, status = $3 WHERE id = $4")
        .bind(plan.actual)
        .bind(plan.margin)
        .bind(plan.status.as_str())
        .bind(recipe_material_id)
        .execute(&state.db_pool)
        .await?;

    let complete = recipe_complete(&state.db_pool, record.recipe_id).await?;
    info!(
        recipe_material_id,
        actual = plan.actual,
        margin = plan.margin,
        status = %plan.status,
        "weight captured"
    );

    Ok(CaptureResponse {
        recipe_material_id,
        actual: plan.actual,
        margin: plan.margin,
        status: plan.status,
        recipe_complete: complete,
    })
}

// GET /scale/net-weight
#[instrument(skip(state))]
pub async fn get_net_weight(
    State(state): State<AppState>,
) -> Result<Json<NetWeightResponse>, AppError> {
    let net_weight = state.scale.read_net_weight().await?;
    Ok(Json(NetWeightResponse { net_weight }))
}

// POST /scale/capture/:recipe_material_id
#[instrument(skip(state), fields(recipe_material_id))]
pub async fn capture_weight(
    Path(recipe_material_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CaptureResponse>, AppError> {
    capture_for_record(&state, recipe_material_id)
        .await
        .map(Json)
}

// POST /scale/start-dosing/:id
//
// Tolerance-gated capture. The status is optimistically moved to
// `in progress` before the device read; any read failure restores the
// pre-attempt status so the record is never left stuck mid-dose.
#[instrument(skip(state), fields(recipe_material_id))]
pub async fn start_dosing(
    Path(recipe_material_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<StartDosingResponse>, AppError> {
    let _guard = state.dosing_locks.acquire(recipe_material_id).await;

    let record = fetch_recipe_material(&state.db_pool, recipe_material_id).await?;
    let prior_status = record.status;

    let already_dosed = !matches!(
        prior_status,
        RecipeMaterialStatus::Pending | RecipeMaterialStatus::InProgress
    );
    if already_dosed && !state.policy.allow_redose {
        return Err(AppError::conflict(format!(
            "Recipe material is already {} and cannot be dosed again",
            prior_status
        )));
    }

    sqlx::query("UPDATE recipe_materials SET status = $1 WHERE id = $2")
        .bind(RecipeMaterialStatus::InProgress.as_str())
        .bind(recipe_material_id)
        .execute(&state.db_pool)
        .await?;

    let set_point = record.set_point.unwrap_or(0.0);
    let tolerance = record.margin.unwrap_or(DEFAULT_TOLERANCE);
    let read = state.scale.read_net_weight().await;

    match dosing::settle_dosing_attempt(prior_status, set_point, tolerance, read) {
        DosingAttempt::Restore { status, error } => {
            warn!(recipe_material_id, error = %error, "device read failed, restoring status");
            sqlx::query("UPDATE recipe_materials SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(recipe_material_id)
                .execute(&state.db_pool)
                .await?;
            Err(error.into())
        }
        DosingAttempt::Settled { actual, status } => {
            sqlx::query("UPDATE recipe_materials SET actual = $1, status = $2 WHERE id = $3")
                .bind(actual)
                .bind(status.as_str())
                .bind(recipe_material_id)
                .execute(&state.db_pool)
                .await?;

            info!(
                recipe_material_id,
                actual,
                target = set_point,
                status = %status,
                "dosing attempt finished"
            );

            Ok(Json(StartDosingResponse {
                recipe_material_id,
                actual_weight: actual,
                target_weight: set_point,
                status,
                within_tolerance: status == RecipeMaterialStatus::Created,
            }))
        }
    }
}
