// src/dtos/material.rs
use serde::{Deserialize, Serialize};

use crate::models::material::{Material, MaterialTransaction, TransactionType, UnitOfMeasure};
use crate::models::ReleaseStatus;

#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub title: String,
    pub description: Option<String>,
    pub unit_of_measure: UnitOfMeasure,
    #[serde(default)]
    pub current_quantity: f64,
    #[serde(default)]
    pub minimum_quantity: f64,
    #[serde(default)]
    pub maximum_quantity: f64,
    pub plant_area_location: Option<String>,
    pub barcode_id: Option<String>,
    pub status: Option<ReleaseStatus>,
    pub supplier: Option<String>,
    pub supplier_contact_info: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMaterialRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub unit_of_measure: Option<UnitOfMeasure>,
    pub current_quantity: Option<f64>,
    pub minimum_quantity: Option<f64>,
    pub maximum_quantity: Option<f64>,
    pub plant_area_location: Option<String>,
    pub barcode_id: Option<String>,
    pub status: Option<ReleaseStatus>,
    pub supplier: Option<String>,
    pub supplier_contact_info: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MaterialResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub unit_of_measure: UnitOfMeasure,
    pub current_quantity: f64,
    pub minimum_quantity: f64,
    pub maximum_quantity: f64,
    pub plant_area_location: Option<String>,
    pub barcode_id: Option<String>,
    pub status: ReleaseStatus,
    pub supplier: Option<String>,
    pub supplier_contact_info: Option<String>,
    pub notes: Option<String>,
    pub margin: f64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Material> for MaterialResponse {
    fn from(m: Material) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            unit_of_measure: m.unit_of_measure,
            current_quantity: m.current_quantity,
            minimum_quantity: m.minimum_quantity,
            maximum_quantity: m.maximum_quantity,
            plant_area_location: m.plant_area_location,
            barcode_id: m.barcode_id,
            status: m.status,
            supplier: m.supplier,
            supplier_contact_info: m.supplier_contact_info,
            notes: m.notes,
            margin: m.margin,
            created_at: m.created_at.map(|dt| dt.to_rfc3339()),
            updated_at: m.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MaterialListResponse {
    pub materials: Vec<MaterialResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub material_id: i64,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQueryParams {
    pub material_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub material_id: i64,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub transaction_date: Option<String>,
    pub description: Option<String>,
}

impl From<MaterialTransaction> for TransactionResponse {
    fn from(t: MaterialTransaction) -> Self {
        Self {
            id: t.id,
            material_id: t.material_id,
            transaction_type: t.transaction_type,
            quantity: t.quantity,
            transaction_date: t.transaction_date.map(|dt| dt.to_rfc3339()),
            description: t.description,
        }
    }
}

/// POST response carries the post-apply balance so callers can reconcile.
#[derive(Debug, Serialize)]
pub struct TransactionCreatedResponse {
    #[serde(flatten)]
    pub transaction: TransactionResponse,
    pub current_quantity: f64,
    pub margin: f64,
}
