// src/dtos/production.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::production::{Batch, BatchMaterialDispensing, OrderStatus, ProductionOrder, WorkStatus};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_number: String,
    pub recipe_id: i64,
    pub batch_size: f64,
    pub scheduled_date: NaiveDate,
    pub created_by: i64,
    pub barcode_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub order_number: Option<String>,
    pub recipe_id: Option<i64>,
    pub batch_size: Option<f64>,
    pub scheduled_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub order_number: String,
    pub recipe_id: i64,
    pub batch_size: f64,
    pub scheduled_date: NaiveDate,
    pub status: OrderStatus,
    pub created_by: i64,
    pub created_by_username: Option<String>,
    pub barcode_id: Option<String>,
    pub notes: Option<String>,
}

impl OrderResponse {
    pub fn from_order(o: ProductionOrder, created_by_username: Option<String>) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            recipe_id: o.recipe_id,
            batch_size: o.batch_size,
            scheduled_date: o.scheduled_date,
            status: o.status,
            created_by: o.created_by,
            created_by_username,
            barcode_id: o.barcode_id,
            notes: o.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub batch_number: String,
    pub order_id: i64,
    pub operator_id: i64,
    pub status: Option<WorkStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBatchRequest {
    pub batch_number: Option<String>,
    pub order_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub status: Option<WorkStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub id: i64,
    pub batch_number: String,
    pub order_id: i64,
    pub operator_id: i64,
    pub status: WorkStatus,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

impl From<Batch> for BatchResponse {
    fn from(b: Batch) -> Self {
        Self {
            id: b.id,
            batch_number: b.batch_number,
            order_id: b.order_id,
            operator_id: b.operator_id,
            status: b.status,
            notes: b.notes,
            created_at: b.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDispensingRequest {
    pub batch_id: i64,
    pub material_id: i64,
    pub planned_quantity: f64,
    pub actual_quantity: Option<f64>,
    pub dispensed_by: i64,
    pub status: Option<WorkStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDispensingRequest {
    pub planned_quantity: Option<f64>,
    pub actual_quantity: Option<f64>,
    pub status: Option<WorkStatus>,
}

#[derive(Debug, Deserialize)]
pub struct DispensingQueryParams {
    pub batch_id: Option<i64>,
}

/// Finalization of a dispensing; falls back to the planned quantity when no
/// measured value is supplied.
#[derive(Debug, Deserialize, Default)]
pub struct CompleteDispensingRequest {
    pub actual_quantity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DispensingResponse {
    pub id: i64,
    pub batch_id: i64,
    pub material_id: i64,
    pub planned_quantity: f64,
    pub actual_quantity: Option<f64>,
    pub dispensed_by: i64,
    pub status: WorkStatus,
}

impl From<BatchMaterialDispensing> for DispensingResponse {
    fn from(d: BatchMaterialDispensing) -> Self {
        Self {
            id: d.id,
            batch_id: d.batch_id,
            material_id: d.material_id,
            planned_quantity: d.planned_quantity,
            actual_quantity: d.actual_quantity,
            dispensed_by: d.dispensed_by,
            status: d.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DispensingCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Computed readiness of a batch; never stored.
#[derive(Debug, Serialize)]
pub struct BatchReadinessResponse {
    pub batch_id: i64,
    pub batch_number: String,
    pub order_id: i64,
    pub recipe_id: i64,
    pub total_materials: i64,
    pub dosed_materials: i64,
    pub dosing_complete: bool,
    pub dispensing: DispensingCounts,
    pub ready: bool,
}
