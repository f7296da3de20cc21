// src/ledger.rs
//
// Inventory ledger: every quantity change is an appended transaction row
// plus an in-step update of the material's current_quantity, executed on the
// caller's open database transaction so the pair commits or rolls back as
// one. Callers hold the material's stock lock for the duration.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Row, Transaction};

use crate::dosing;
use crate::error::AppError;
use crate::models::material::TransactionType;

#[derive(Debug)]
pub struct LedgerApplied {
    pub transaction_id: i64,
    pub transaction_date: Option<DateTime<Utc>>,
    pub new_quantity: f64,
    pub new_margin: f64,
}

/// Appends a ledger entry and applies it to the material balance.
///
/// Rejects non-positive quantities and removals that would drive the balance
/// negative; in both cases nothing is written. The row is locked FOR UPDATE
/// and the write compares against the quantity it read, so a racing writer
/// shows up as a Conflict instead of a lost update.
pub async fn record_and_apply(
    tx: &mut Transaction<'_, Postgres>,
    material_id: i64,
    transaction_type: TransactionType,
    quantity: f64,
    description: Option<&str>,
) -> Result<LedgerApplied, AppError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(AppError::validation("quantity must be a positive number"));
    }

    let row = sqlx::query(
        "SELECT current_quantity::FLOAT8 AS current_quantity,
                maximum_quantity::FLOAT8 AS maximum_quantity
         FROM materials WHERE id = $1 FOR UPDATE",
    )
    .bind(material_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::not_found("Material not found"))?;

    let current: f64 = row.get("current_quantity");
    let maximum: f64 = row.get("maximum_quantity");

    let new_quantity = current + transaction_type.signed(quantity);
    if new_quantity < 0.0 {
        return Err(AppError::insufficient_stock(format!(
            "Insufficient stock: {} available, removal of {} requested",
            current, quantity
        )));
    }
    let new_margin = dosing::stock_margin(new_quantity, maximum);

    let updated = sqlx::query(
        "UPDATE materials
         SET current_quantity = $1, margin = $2, updated_at = NOW()
         WHERE id = $3 AND current_quantity::FLOAT8 = $4",
    )
    .bind(new_quantity)
    .bind(new_margin)
    .bind(material_id)
    .bind(current)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict(
            "Material stock changed concurrently, please retry",
        ));
    }

    let inserted = sqlx::query(
        "INSERT INTO material_transactions (material_id, transaction_type, quantity, description)
         VALUES ($1, $2, $3, $4)
         RETURNING id, transaction_date",
    )
    .bind(material_id)
    .bind(transaction_type.as_str())
    .bind(quantity)
    .bind(description)
    .fetch_one(&mut **tx)
    .await?;

    Ok(LedgerApplied {
        transaction_id: inserted.get("id"),
        transaction_date: inserted.get("transaction_date"),
        new_quantity,
        new_margin,
    })
}
