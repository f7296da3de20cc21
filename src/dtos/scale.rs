// src/dtos/scale.rs
use serde::Serialize;

use crate::models::recipe::RecipeMaterialStatus;

#[derive(Debug, Serialize)]
pub struct NetWeightResponse {
    pub net_weight: f64,
}

/// Result of a device capture against a dosing record.
#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub recipe_material_id: i64,
    pub actual: f64,
    pub margin: f64,
    pub status: RecipeMaterialStatus,
    /// True once every dosing record of the recipe reports `created`.
    pub recipe_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct StartDosingResponse {
    pub recipe_material_id: i64,
    pub actual_weight: f64,
    pub target_weight: f64,
    pub status: RecipeMaterialStatus,
    pub within_tolerance: bool,
}
