// src/handlers/production.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::Row;
use tracing::{info, instrument, warn};

use crate::dtos::production::{
    BatchReadinessResponse, BatchResponse, CompleteDispensingRequest, CreateBatchRequest,
    CreateDispensingRequest, CreateOrderRequest, DispensingCounts, DispensingQueryParams,
    DispensingResponse, OrderResponse, UpdateBatchRequest, UpdateDispensingRequest,
    UpdateOrderRequest,
};
use crate::error::{map_fk_conflict, map_fk_violation, map_unique_violation, AppError};
use crate::ledger;
use crate::models::material::TransactionType;
use crate::models::production::{Batch, BatchMaterialDispensing, OrderStatus, ProductionOrder, WorkStatus};
use crate::state::AppState;

const ORDER_COLUMNS: &str = "id, order_number, recipe_id,
    batch_size::FLOAT8 AS batch_size, scheduled_date, status, created_by,
    barcode_id, notes, created_at";

const BATCH_COLUMNS: &str = "id, batch_number, order_id, operator_id, status, notes, created_at";

const DISPENSING_COLUMNS: &str = "id, batch_id, material_id,
    planned_quantity::FLOAT8 AS planned_quantity,
    actual_quantity::FLOAT8 AS actual_quantity, dispensed_by, status";

async fn user_exists(pool: &sqlx::PgPool, id: i64) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

// ==================== Production orders ====================

// POST /production_orders
#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    if payload.order_number.trim().is_empty() {
        return Err(AppError::validation("order_number is required"));
    }
    if !payload.batch_size.is_finite() || payload.batch_size <= 0.0 {
        return Err(AppError::validation("batch_size must be a positive number"));
    }

    let recipe_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE id = $1")
        .bind(payload.recipe_id)
        .fetch_one(&state.db_pool)
        .await?;
    if recipe_exists == 0 {
        return Err(AppError::validation("Recipe not found"));
    }
    if !user_exists(&state.db_pool, payload.created_by).await? {
        return Err(AppError::validation("User not found"));
    }

    let order = sqlx::query_as::<_, ProductionOrder>(&format!(
        "INSERT INTO production_orders
            (order_number, recipe_id, batch_size, scheduled_date, status, created_by,
             barcode_id, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&payload.order_number)
    .bind(payload.recipe_id)
    .bind(payload.batch_size)
    .bind(payload.scheduled_date)
    .bind(OrderStatus::Planned.as_str())
    .bind(payload.created_by)
    .bind(&payload.barcode_id)
    .bind(&payload.notes)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Duplicate order_number or barcode_id"))?;

    info!(order_id = order.id, order_number = %order.order_number, "production order created");
    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(order, None))))
}

// GET /production_orders
#[instrument(skip(state))]
pub async fn get_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let rows = sqlx::query(
        "SELECT o.id, o.order_number, o.recipe_id,
                o.batch_size::FLOAT8 AS batch_size, o.scheduled_date, o.status,
                o.created_by, o.barcode_id, o.notes, o.created_at,
                u.username AS created_by_username
         FROM production_orders o
         LEFT JOIN users u ON o.created_by = u.id
         ORDER BY o.scheduled_date, o.id",
    )
    .fetch_all(&state.db_pool)
    .await?;

    let orders = rows
        .into_iter()
        .map(|row| {
            let status: String = row.get("status");
            Ok(OrderResponse {
                id: row.get("id"),
                order_number: row.get("order_number"),
                recipe_id: row.get("recipe_id"),
                batch_size: row.get("batch_size"),
                scheduled_date: row.get("scheduled_date"),
                status: OrderStatus::try_from(status)
                    .map_err(|e| AppError::validation(e.to_string()))?,
                created_by: row.get("created_by"),
                created_by_username: row.get("created_by_username"),
                barcode_id: row.get("barcode_id"),
                notes: row.get("notes"),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(orders))
}

// GET /production_orders/:id
#[instrument(skip(state), fields(id))]
pub async fn get_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = sqlx::query_as::<_, ProductionOrder>(&format!(
        "SELECT {ORDER_COLUMNS} FROM production_orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Production order not found"))?;

    let username: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
        .bind(order.created_by)
        .fetch_optional(&state.db_pool)
        .await?;

    Ok(Json(OrderResponse::from_order(order, username)))
}

// PUT /production_orders/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = sqlx::query_as::<_, ProductionOrder>(&format!(
        "UPDATE production_orders SET
            order_number = COALESCE($1, order_number),
            recipe_id = COALESCE($2, recipe_id),
            batch_size = COALESCE($3, batch_size),
            scheduled_date = COALESCE($4, scheduled_date),
            status = COALESCE($5, status),
            notes = COALESCE($6, notes)
         WHERE id = $7
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(payload.order_number)
    .bind(payload.recipe_id)
    .bind(payload.batch_size)
    .bind(payload.scheduled_date)
    .bind(payload.status.map(|s| s.as_str()))
    .bind(payload.notes)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::conflict("Duplicate order_number or barcode_id");
            }
            if db_err.code().as_deref() == Some("23503") {
                return AppError::validation("Invalid recipe_id");
            }
        }
        AppError::db(e)
    })?
    .ok_or_else(|| AppError::not_found("Production order not found"))?;

    Ok(Json(OrderResponse::from_order(order, None)))
}

// PUT /production_orders/:id/reject
#[instrument(skip(state), fields(id))]
pub async fn reject_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query("UPDATE production_orders SET status = $1 WHERE id = $2")
        .bind(OrderStatus::Rejected.as_str())
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Production order not found"));
    }

    info!(order_id = id, "production order rejected");
    Ok(Json(serde_json::json!({
        "message": "Production order rejected successfully"
    })))
}

// DELETE /production_orders/:id
//
// Refused while any batch references the order; the check and the delete
// share a transaction so a batch created in between cannot be orphaned.
#[instrument(skip(state), fields(id))]
pub async fn delete_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM production_orders WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("Production order not found"));
    }

    let batches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE order_id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if batches > 0 {
        warn!(order_id = id, batches, "refusing order delete, batches exist");
        return Err(AppError::conflict(
            "Cannot delete an order because batch data exists for this order. Please delete the batch first",
        ));
    }

    // A batch inserted after the guard surfaces as an FK violation here;
    // report it the same way the guard would have.
    sqlx::query("DELETE FROM production_orders WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_fk_conflict(
                e,
                "Cannot delete an order because batch data exists for this order. Please delete the batch first",
            )
        })?;
    tx.commit().await?;

    info!(order_id = id, "production order deleted");
    Ok(Json(serde_json::json!({
        "message": format!("Production order {} deleted successfully", id)
    })))
}

// ==================== Batches ====================

// POST /batches
#[instrument(skip(state, payload))]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), AppError> {
    if payload.batch_number.trim().is_empty() {
        return Err(AppError::validation("batch_number is required"));
    }

    let order_exists: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM production_orders WHERE id = $1")
            .bind(payload.order_id)
            .fetch_one(&state.db_pool)
            .await?;
    if order_exists == 0 {
        return Err(AppError::validation(format!(
            "Order with ID {} does not exist",
            payload.order_id
        )));
    }
    if !user_exists(&state.db_pool, payload.operator_id).await? {
        return Err(AppError::validation(format!(
            "Operator with ID {} does not exist",
            payload.operator_id
        )));
    }

    let status = payload.status.unwrap_or(WorkStatus::Pending);
    let batch = sqlx::query_as::<_, Batch>(&format!(
        "INSERT INTO batches (batch_number, order_id, operator_id, status, notes)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {BATCH_COLUMNS}"
    ))
    .bind(&payload.batch_number)
    .bind(payload.order_id)
    .bind(payload.operator_id)
    .bind(status.as_str())
    .bind(&payload.notes)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        map_unique_violation(
            e,
            &format!("Batch number {} already exists", payload.batch_number),
        )
    })?;

    info!(batch_id = batch.id, batch_number = %batch.batch_number, "batch created");
    Ok((StatusCode::CREATED, Json(BatchResponse::from(batch))))
}

// GET /batches
#[instrument(skip(state))]
pub async fn get_batches(
    State(state): State<AppState>,
) -> Result<Json<Vec<BatchResponse>>, AppError> {
    let batches = sqlx::query_as::<_, Batch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM batches ORDER BY id"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(batches.into_iter().map(BatchResponse::from).collect()))
}

// GET /batches/:id
#[instrument(skip(state), fields(id))]
pub async fn get_batch(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<BatchResponse>, AppError> {
    let batch = sqlx::query_as::<_, Batch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Batch not found"))?;

    Ok(Json(BatchResponse::from(batch)))
}

// PUT /batches/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_batch(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateBatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    if let Some(operator_id) = payload.operator_id {
        if !user_exists(&state.db_pool, operator_id).await? {
            return Err(AppError::validation(format!(
                "Operator with ID {} does not exist",
                operator_id
            )));
        }
    }

    let batch = sqlx::query_as::<_, Batch>(&format!(
        "UPDATE batches SET
            batch_number = COALESCE($1, batch_number),
            order_id = COALESCE($2, order_id),
            operator_id = COALESCE($3, operator_id),
            status = COALESCE($4, status),
            notes = COALESCE($5, notes)
         WHERE id = $6
         RETURNING {BATCH_COLUMNS}"
    ))
    .bind(payload.batch_number)
    .bind(payload.order_id)
    .bind(payload.operator_id)
    .bind(payload.status.map(|s| s.as_str()))
    .bind(payload.notes)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| map_fk_violation(e, "Invalid order_id"))?
    .ok_or_else(|| AppError::not_found("Batch not found"))?;

    Ok(Json(BatchResponse::from(batch)))
}

// DELETE /batches/:id
//
// Dispensing rows belong to the batch; they go first in the same unit.
#[instrument(skip(state), fields(id))]
pub async fn delete_batch(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("Batch not found"));
    }

    sqlx::query("DELETE FROM batch_material_dispensing WHERE batch_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM batches WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(batch_id = id, "batch deleted");
    Ok(Json(serde_json::json!({ "message": "Batch deleted successfully" })))
}

// GET /batches/:id/readiness
//
// Computed, never stored: a batch is ready once every dosing record of the
// order's recipe reports `created` and no dispensing is still open.
#[instrument(skip(state), fields(id))]
pub async fn get_batch_readiness(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<BatchReadinessResponse>, AppError> {
    let row = sqlx::query(
        "SELECT b.id, b.batch_number, b.order_id, o.recipe_id
         FROM batches b
         JOIN production_orders o ON b.order_id = o.id
         WHERE b.id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Batch not found"))?;

    let batch_number: String = row.get("batch_number");
    let order_id: i64 = row.get("order_id");
    let recipe_id: i64 = row.get("recipe_id");

    let counts = sqlx::query(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'created') AS dosed
         FROM recipe_materials WHERE recipe_id = $1",
    )
    .bind(recipe_id)
    .fetch_one(&state.db_pool)
    .await?;
    let total_materials: i64 = counts.get("total");
    let dosed_materials: i64 = counts.get("dosed");
    let dosing_complete = total_materials > 0 && dosed_materials == total_materials;

    let dispensing_row = sqlx::query(
        "SELECT COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'in progress') AS in_progress,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed
         FROM batch_material_dispensing WHERE batch_id = $1",
    )
    .bind(id)
    .fetch_one(&state.db_pool)
    .await?;
    let dispensing = DispensingCounts {
        pending: dispensing_row.get("pending"),
        in_progress: dispensing_row.get("in_progress"),
        completed: dispensing_row.get("completed"),
    };

    let ready = dosing_complete && dispensing.pending == 0 && dispensing.in_progress == 0;

    Ok(Json(BatchReadinessResponse {
        batch_id: id,
        batch_number,
        order_id,
        recipe_id,
        total_materials,
        dosed_materials,
        dosing_complete,
        dispensing,
        ready,
    }))
}

// ==================== Batch material dispensing ====================

// POST /batch_dispensing
#[instrument(skip(state, payload))]
pub async fn create_dispensing(
    State(state): State<AppState>,
    Json(payload): Json<CreateDispensingRequest>,
) -> Result<(StatusCode, Json<DispensingResponse>), AppError> {
    if !payload.planned_quantity.is_finite() || payload.planned_quantity <= 0.0 {
        return Err(AppError::validation("planned_quantity must be a positive number"));
    }

    let batch_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE id = $1")
        .bind(payload.batch_id)
        .fetch_one(&state.db_pool)
        .await?;
    if batch_exists == 0 {
        return Err(AppError::validation("Batch not found"));
    }
    let material_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE id = $1")
        .bind(payload.material_id)
        .fetch_one(&state.db_pool)
        .await?;
    if material_exists == 0 {
        return Err(AppError::validation("Material not found"));
    }

    let status = payload.status.unwrap_or(WorkStatus::Pending);
    let record = sqlx::query_as::<_, BatchMaterialDispensing>(&format!(
        "INSERT INTO batch_material_dispensing
            (batch_id, material_id, planned_quantity, actual_quantity, dispensed_by, status)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {DISPENSING_COLUMNS}"
    ))
    .bind(payload.batch_id)
    .bind(payload.material_id)
    .bind(payload.planned_quantity)
    .bind(payload.actual_quantity)
    .bind(payload.dispensed_by)
    .bind(status.as_str())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_fk_violation(e, "Invalid dispensed_by reference"))?;

    info!(dispensing_id = record.id, batch_id = record.batch_id, "dispensing record created");
    Ok((StatusCode::CREATED, Json(DispensingResponse::from(record))))
}

// GET /batch_dispensing[?batch_id=]
#[instrument(skip(state))]
pub async fn get_dispensing_records(
    State(state): State<AppState>,
    Query(params): Query<DispensingQueryParams>,
) -> Result<Json<Vec<DispensingResponse>>, AppError> {
    let records = match params.batch_id {
        Some(batch_id) => {
            sqlx::query_as::<_, BatchMaterialDispensing>(&format!(
                "SELECT {DISPENSING_COLUMNS} FROM batch_material_dispensing
                 WHERE batch_id = $1 ORDER BY id"
            ))
            .bind(batch_id)
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, BatchMaterialDispensing>(&format!(
                "SELECT {DISPENSING_COLUMNS} FROM batch_material_dispensing ORDER BY id"
            ))
            .fetch_all(&state.db_pool)
            .await?
        }
    };

    Ok(Json(records.into_iter().map(DispensingResponse::from).collect()))
}

// PUT /batch_dispensing/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_dispensing(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateDispensingRequest>,
) -> Result<Json<DispensingResponse>, AppError> {
    if let Some(planned) = payload.planned_quantity {
        if !planned.is_finite() || planned <= 0.0 {
            return Err(AppError::validation("planned_quantity must be a positive number"));
        }
    }

    let record = sqlx::query_as::<_, BatchMaterialDispensing>(&format!(
        "UPDATE batch_material_dispensing SET
            planned_quantity = COALESCE($1, planned_quantity),
            actual_quantity = COALESCE($2, actual_quantity),
            status = COALESCE($3, status)
         WHERE id = $4
         RETURNING {DISPENSING_COLUMNS}"
    ))
    .bind(payload.planned_quantity)
    .bind(payload.actual_quantity)
    .bind(payload.status.map(|s| s.as_str()))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Dispensing record not found"))?;

    Ok(Json(DispensingResponse::from(record)))
}

// DELETE /batch_dispensing/:id
#[instrument(skip(state), fields(id))]
pub async fn delete_dispensing(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query("DELETE FROM batch_material_dispensing WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Dispensing record not found"));
    }

    info!(dispensing_id = id, "dispensing record deleted");
    Ok(Json(serde_json::json!({
        "message": "Dispensing record deleted successfully"
    })))
}

// POST /batch_dispensing/:id/complete
//
// Finalizes a dispensing: the consumed quantity becomes a `removal` ledger
// entry against the material, in the same transaction as the status change.
// The material's stock lock is held so concurrent dosing of the same
// material across batches cannot lose an update.
#[instrument(skip(state, payload), fields(id))]
pub async fn complete_dispensing(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<CompleteDispensingRequest>,
) -> Result<Json<DispensingResponse>, AppError> {
    let record = sqlx::query_as::<_, BatchMaterialDispensing>(&format!(
        "SELECT {DISPENSING_COLUMNS} FROM batch_material_dispensing WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Dispensing record not found"))?;

    if record.status == WorkStatus::Completed {
        return Err(AppError::conflict("Dispensing record is already completed"));
    }

    let actual = payload.actual_quantity.unwrap_or(record.planned_quantity);
    if !actual.is_finite() || actual <= 0.0 {
        return Err(AppError::validation("actual_quantity must be a positive number"));
    }

    let _stock_guard = state.stock_locks.acquire(record.material_id).await;
    let mut tx = state.db_pool.begin().await?;

    let updated = sqlx::query_as::<_, BatchMaterialDispensing>(&format!(
        "UPDATE batch_material_dispensing
         SET actual_quantity = $1, status = $2
         WHERE id = $3 AND status <> $2
         RETURNING {DISPENSING_COLUMNS}"
    ))
    .bind(actual)
    .bind(WorkStatus::Completed.as_str())
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::conflict("Dispensing record is already completed"))?;

    ledger::record_and_apply(
        &mut tx,
        record.material_id,
        TransactionType::Removal,
        actual,
        Some(&format!("Dispensed into batch {}", record.batch_id)),
    )
    .await?;

    tx.commit().await?;
    info!(
        dispensing_id = id,
        material_id = record.material_id,
        quantity = actual,
        "dispensing completed and stock consumed"
    );

    Ok(Json(DispensingResponse::from(updated)))
}
