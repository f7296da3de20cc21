// src/handlers/material.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::dosing;
use crate::dtos::material::{
    CreateMaterialRequest, CreateTransactionRequest, MaterialListResponse, MaterialResponse,
    PaginationParams, TransactionCreatedResponse, TransactionQueryParams, TransactionResponse,
    UpdateMaterialRequest,
};
use crate::error::{map_unique_violation, AppError};
use crate::ledger;
use crate::models::material::{Material, MaterialTransaction};
use crate::models::ReleaseStatus;
use crate::state::AppState;

const MATERIAL_COLUMNS: &str = "id, title, description, unit_of_measure,
    current_quantity::FLOAT8 AS current_quantity,
    minimum_quantity::FLOAT8 AS minimum_quantity,
    maximum_quantity::FLOAT8 AS maximum_quantity,
    plant_area_location, barcode_id, status, supplier, supplier_contact_info,
    notes, margin::FLOAT8 AS margin, created_at, updated_at";

fn check_quantities(current: f64, minimum: f64, maximum: f64) -> Result<(), AppError> {
    for (name, v) in [("current_quantity", current), ("minimum_quantity", minimum), ("maximum_quantity", maximum)] {
        if !v.is_finite() || v < 0.0 {
            return Err(AppError::validation(format!("{} must be a non-negative number", name)));
        }
    }
    if minimum > maximum {
        return Err(AppError::validation(
            "minimum_quantity cannot exceed maximum_quantity",
        ));
    }
    Ok(())
}

// POST /materials
#[instrument(skip(state, payload))]
pub async fn create_material(
    State(state): State<AppState>,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<MaterialResponse>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::validation("title is required"));
    }
    check_quantities(payload.current_quantity, payload.minimum_quantity, payload.maximum_quantity)?;

    let status = payload.status.unwrap_or(ReleaseStatus::Unreleased);
    let margin = dosing::stock_margin(payload.current_quantity, payload.maximum_quantity);

    let material = sqlx::query_as::<_, Material>(&format!(
        "INSERT INTO materials
            (title, description, unit_of_measure, current_quantity, minimum_quantity,
             maximum_quantity, plant_area_location, barcode_id, status, supplier,
             supplier_contact_info, notes, margin)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {MATERIAL_COLUMNS}"
    ))
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.unit_of_measure.as_str())
    .bind(payload.current_quantity)
    .bind(payload.minimum_quantity)
    .bind(payload.maximum_quantity)
    .bind(&payload.plant_area_location)
    .bind(&payload.barcode_id)
    .bind(status.as_str())
    .bind(&payload.supplier)
    .bind(&payload.supplier_contact_info)
    .bind(&payload.notes)
    .bind(margin)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Material barcode_id already exists"))?;

    info!(material_id = material.id, "material created");
    Ok((StatusCode::CREATED, Json(MaterialResponse::from(material))))
}

// GET /materials?page=&limit=
#[instrument(skip(state))]
pub async fn get_materials(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<MaterialListResponse>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let materials = sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials")
        .fetch_one(&state.db_pool)
        .await?;

    Ok(Json(MaterialListResponse {
        materials: materials.into_iter().map(MaterialResponse::from).collect(),
        total,
        page,
        limit,
    }))
}

// GET /materials/all
#[instrument(skip(state))]
pub async fn get_all_materials(
    State(state): State<AppState>,
) -> Result<Json<Vec<MaterialResponse>>, AppError> {
    let materials = sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY id"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(materials.into_iter().map(MaterialResponse::from).collect()))
}

// GET /materials/:id
#[instrument(skip(state), fields(id))]
pub async fn get_material(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MaterialResponse>, AppError> {
    let material = sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Material not found"))?;

    Ok(Json(MaterialResponse::from(material)))
}

// GET /materials/barcode/:barcode
#[instrument(skip(state))]
pub async fn get_material_by_barcode(
    Path(barcode): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MaterialResponse>, AppError> {
    let material = sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE barcode_id = $1"
    ))
    .bind(&barcode)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Material not found"))?;

    Ok(Json(MaterialResponse::from(material)))
}

// PUT /materials/:id
//
// Quantities feed the derived stock margin, so the update reads the current
// row, merges the patch, and writes the full new state while holding the
// material's stock lock against concurrent ledger writes.
#[instrument(skip(state, payload), fields(id))]
pub async fn update_material(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMaterialRequest>,
) -> Result<Json<MaterialResponse>, AppError> {
    let _stock_guard = state.stock_locks.acquire(id).await;

    let existing = sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Material not found"))?;

    let current = payload.current_quantity.unwrap_or(existing.current_quantity);
    let minimum = payload.minimum_quantity.unwrap_or(existing.minimum_quantity);
    let maximum = payload.maximum_quantity.unwrap_or(existing.maximum_quantity);
    check_quantities(current, minimum, maximum)?;

    let unit = payload.unit_of_measure.unwrap_or(existing.unit_of_measure);
    let status = payload.status.unwrap_or(existing.status);
    let margin = dosing::stock_margin(current, maximum);

    let material = sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET
            title = $1, description = $2, unit_of_measure = $3,
            current_quantity = $4, minimum_quantity = $5, maximum_quantity = $6,
            plant_area_location = $7, barcode_id = $8, status = $9,
            supplier = $10, supplier_contact_info = $11, notes = $12,
            margin = $13, updated_at = NOW()
         WHERE id = $14
         RETURNING {MATERIAL_COLUMNS}"
    ))
    .bind(payload.title.unwrap_or(existing.title))
    .bind(payload.description.or(existing.description))
    .bind(unit.as_str())
    .bind(current)
    .bind(minimum)
    .bind(maximum)
    .bind(payload.plant_area_location.or(existing.plant_area_location))
    .bind(payload.barcode_id.or(existing.barcode_id))
    .bind(status.as_str())
    .bind(payload.supplier.or(existing.supplier))
    .bind(payload.supplier_contact_info.or(existing.supplier_contact_info))
    .bind(payload.notes.or(existing.notes))
    .bind(margin)
    .bind(id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Material barcode_id already exists"))?;

    Ok(Json(MaterialResponse::from(material)))
}

// DELETE /materials/:id
//
// Refused while any recipe references the material; otherwise the material
// and its transaction history go in one unit.
#[instrument(skip(state), fields(id))]
pub async fn delete_material(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("Material not found"));
    }

    let references: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM recipe_materials WHERE material_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if references > 0 {
        warn!(material_id = id, references, "refusing material delete, still referenced");
        return Err(AppError::conflict(
            "Cannot delete material because it is referenced by recipe materials",
        ));
    }

    // FK ordering: transactions first, then the material.
    sqlx::query("DELETE FROM material_transactions WHERE material_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM materials WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(material_id = id, "material and transactions deleted");
    Ok(Json(serde_json::json!({
        "message": "Material and associated transactions deleted successfully"
    })))
}

// POST /material-transactions
#[instrument(skip(state, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionCreatedResponse>), AppError> {
    let _stock_guard = state.stock_locks.acquire(payload.material_id).await;

    let mut tx = state.db_pool.begin().await?;
    let applied = ledger::record_and_apply(
        &mut tx,
        payload.material_id,
        payload.transaction_type,
        payload.quantity,
        payload.description.as_deref(),
    )
    .await?;
    tx.commit().await?;

    info!(
        material_id = payload.material_id,
        transaction_type = %payload.transaction_type,
        quantity = payload.quantity,
        "ledger entry recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(TransactionCreatedResponse {
            transaction: TransactionResponse {
                id: applied.transaction_id,
                material_id: payload.material_id,
                transaction_type: payload.transaction_type,
                quantity: payload.quantity,
                transaction_date: applied.transaction_date.map(|dt| dt.to_rfc3339()),
                description: payload.description,
            },
            current_quantity: applied.new_quantity,
            margin: applied.new_margin,
        }),
    ))
}

// GET /material-transactions[?material_id=]
#[instrument(skip(state))]
pub async fn get_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionQueryParams>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = match params.material_id {
        Some(material_id) => {
            sqlx::query_as::<_, MaterialTransaction>(
                "SELECT id, material_id, transaction_type, quantity::FLOAT8 AS quantity,
                        transaction_date, description
                 FROM material_transactions WHERE material_id = $1
                 ORDER BY transaction_date DESC, id DESC",
            )
            .bind(material_id)
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MaterialTransaction>(
                "SELECT id, material_id, transaction_type, quantity::FLOAT8 AS quantity,
                        transaction_date, description
                 FROM material_transactions
                 ORDER BY transaction_date DESC, id DESC",
            )
            .fetch_all(&state.db_pool)
            .await?
        }
    };

    Ok(Json(transactions.into_iter().map(TransactionResponse::from).collect()))
}

// GET /material-transactions/:id
#[instrument(skip(state), fields(id))]
pub async fn get_transaction(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = sqlx::query_as::<_, MaterialTransaction>(
        "SELECT id, material_id, transaction_type, quantity::FLOAT8 AS quantity,
                transaction_date, description
         FROM material_transactions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    Ok(Json(TransactionResponse::from(transaction)))
}
