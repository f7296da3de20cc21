// src/dtos/recipe.rs
use serde::{Deserialize, Serialize};

use crate::models::recipe::{Recipe, RecipeMaterial, RecipeMaterialStatus};
use crate::models::ReleaseStatus;

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub version: String,
    pub status: Option<ReleaseStatus>,
    pub created_by: i64,
    pub barcode_id: Option<String>,
    pub no_of_materials: Option<i32>,
    pub sequence: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub status: Option<ReleaseStatus>,
    pub no_of_materials: Option<i32>,
    pub sequence: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RecipePageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub version: String,
    pub status: ReleaseStatus,
    pub created_by: i64,
    pub barcode_id: Option<String>,
    pub no_of_materials: Option<i32>,
    pub sequence: Option<i32>,
    pub created_at: Option<String>,
}

impl From<Recipe> for RecipeResponse {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            name: r.name,
            code: r.code,
            description: r.description,
            version: r.version,
            status: r.status,
            created_by: r.created_by,
            barcode_id: r.barcode_id,
            no_of_materials: r.no_of_materials,
            sequence: r.sequence,
            created_at: r.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipePageResponse {
    pub recipes: Vec<RecipeResponse>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Upsert keyed on (recipe_id, material_id); `use_scale` trades a manual
/// `actual` value for a device read.
#[derive(Debug, Deserialize)]
pub struct UpsertRecipeMaterialRequest {
    pub recipe_id: i64,
    pub material_id: i64,
    pub set_point: f64,
    pub actual: Option<f64>,
    #[serde(default)]
    pub use_scale: bool,
    /// Required; validated by the handler so an omitted status cannot
    /// silently rewrite an already-dosed record.
    pub status: Option<RecipeMaterialStatus>,
    pub bucket_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecipeMaterialRequest {
    pub material_id: Option<i64>,
    pub set_point: Option<f64>,
    pub bucket_id: Option<i64>,
    pub status: Option<RecipeMaterialStatus>,
}

#[derive(Debug, Serialize)]
pub struct RecipeMaterialResponse {
    pub id: i64,
    pub recipe_id: i64,
    pub material_id: i64,
    pub bucket_id: Option<i64>,
    pub set_point: Option<f64>,
    pub actual: Option<f64>,
    pub margin: Option<f64>,
    pub status: RecipeMaterialStatus,
}

impl From<RecipeMaterial> for RecipeMaterialResponse {
    fn from(rm: RecipeMaterial) -> Self {
        Self {
            id: rm.id,
            recipe_id: rm.recipe_id,
            material_id: rm.material_id,
            bucket_id: rm.bucket_id,
            set_point: rm.set_point,
            actual: rm.actual,
            margin: rm.margin,
            status: rm.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpsertRecipeMaterialResponse {
    #[serde(flatten)]
    pub recipe_material: RecipeMaterialResponse,
    pub scale_used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_status_is_not_defaulted() {
        // An omitted status must surface as None so the handler can reject
        // it, not silently re-open a `created` record as `pending`.
        let req: UpsertRecipeMaterialRequest = serde_json::from_value(json!({
            "recipe_id": 1,
            "material_id": 2,
            "set_point": 100.0,
            "actual": 99.9
        }))
        .unwrap();
        assert!(req.status.is_none());
        assert!(!req.use_scale);
    }

    #[test]
    fn upsert_status_accepts_dosing_spellings() {
        let req: UpsertRecipeMaterialRequest = serde_json::from_value(json!({
            "recipe_id": 1,
            "material_id": 2,
            "set_point": 100.0,
            "actual": 99.9,
            "status": "in progress"
        }))
        .unwrap();
        assert_eq!(req.status, Some(RecipeMaterialStatus::InProgress));
    }
}
