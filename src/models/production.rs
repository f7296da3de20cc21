use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::InvalidEnumValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Planned,
    Rejected,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Planned => "planned",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "planned" => Ok(OrderStatus::Planned),
            "rejected" => Ok(OrderStatus::Rejected),
            "completed" => Ok(OrderStatus::Completed),
            _ => Err(InvalidEnumValue { field: "order status", value }),
        }
    }
}

/// Shared by batches and dispensing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Pending => "pending",
            WorkStatus::InProgress => "in progress",
            WorkStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for WorkStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(WorkStatus::Pending),
            "in progress" => Ok(WorkStatus::InProgress),
            "completed" => Ok(WorkStatus::Completed),
            _ => Err(InvalidEnumValue { field: "work status", value }),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProductionOrder {
    pub id: i64,
    pub order_number: String,
    pub recipe_id: i64,
    pub batch_size: f64,
    pub scheduled_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub created_by: i64,
    pub barcode_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
pub struct Batch {
    pub id: i64,
    pub batch_number: String,
    pub order_id: i64,
    pub operator_id: i64,
    #[sqlx(try_from = "String")]
    pub status: WorkStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// What was actually consumed per batch per material; the bridge between a
/// dosing result and the inventory ledger.
#[derive(Debug, FromRow)]
pub struct BatchMaterialDispensing {
    pub id: i64,
    pub batch_id: i64,
    pub material_id: i64,
    pub planned_quantity: f64,
    pub actual_quantity: Option<f64>,
    pub dispensed_by: i64,
    #[sqlx(try_from = "String")]
    pub status: WorkStatus,
}
