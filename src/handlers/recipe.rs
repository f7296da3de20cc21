// src/handlers/recipe.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::dosing;
use crate::dtos::recipe::{
    CreateRecipeRequest, RecipeMaterialResponse, RecipePageParams, RecipePageResponse,
    RecipeResponse, UpdateRecipeMaterialRequest, UpdateRecipeRequest,
    UpsertRecipeMaterialRequest, UpsertRecipeMaterialResponse,
};
use crate::dtos::scale::CaptureResponse;
use crate::error::{map_unique_violation, AppError};
use crate::handlers::scale::capture_for_record;
use crate::models::recipe::{Recipe, RecipeMaterial};
use crate::models::ReleaseStatus;
use crate::state::AppState;

const RECIPE_COLUMNS: &str = "id, name, code, description, version, status, created_by,
    barcode_id, no_of_materials, sequence, created_at, updated_at";

const RECIPE_MATERIAL_COLUMNS: &str = "id, recipe_id, material_id, bucket_id,
    set_point::FLOAT8 AS set_point, actual::FLOAT8 AS actual,
    margin::FLOAT8 AS margin, status";

// POST /recipes
#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    for (name, value) in [
        ("name", &payload.name),
        ("code", &payload.code),
        ("version", &payload.version),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::validation(format!("'{}' is required", name)));
        }
    }
    if let Some(n) = payload.no_of_materials {
        if n < 0 {
            return Err(AppError::validation("no_of_materials must be a non-negative integer"));
        }
    }

    let user_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(payload.created_by)
        .fetch_one(&state.db_pool)
        .await?;
    if user_exists == 0 {
        return Err(AppError::validation("User not found"));
    }

    let status = payload.status.unwrap_or(ReleaseStatus::Unreleased);
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "INSERT INTO recipes
            (name, code, description, version, status, created_by, barcode_id,
             no_of_materials, sequence)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(&payload.description)
    .bind(&payload.version)
    .bind(status.as_str())
    .bind(payload.created_by)
    .bind(&payload.barcode_id)
    .bind(payload.no_of_materials)
    .bind(payload.sequence)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Duplicate entry: code or barcode_id already exists"))?;

    info!(recipe_id = recipe.id, code = %recipe.code, "recipe created");
    Ok((StatusCode::CREATED, Json(RecipeResponse::from(recipe))))
}

// GET /recipes
#[instrument(skip(state))]
pub async fn get_recipes(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let recipes = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY sequence NULLS LAST, id"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(recipes.into_iter().map(RecipeResponse::from).collect()))
}

// GET /recipes/paginated?page=&page_size=
#[instrument(skip(state))]
pub async fn get_paginated_recipes(
    State(state): State<AppState>,
    Query(params): Query<RecipePageParams>,
) -> Result<Json<RecipePageResponse>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.page_size.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let recipes = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.db_pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&state.db_pool)
        .await?;
    let pages = (total + per_page - 1) / per_page;

    Ok(Json(RecipePageResponse {
        recipes: recipes.into_iter().map(RecipeResponse::from).collect(),
        total,
        page,
        pages,
        per_page,
        has_next: page < pages,
        has_prev: page > 1,
    }))
}

// GET /recipes/:id
#[instrument(skip(state), fields(id))]
pub async fn get_recipe(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Recipe not found"))?;

    Ok(Json(RecipeResponse::from(recipe)))
}

// PUT /recipes/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_recipe(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "UPDATE recipes SET
            name = COALESCE($1, name),
            code = COALESCE($2, code),
            description = COALESCE($3, description),
            version = COALESCE($4, version),
            status = COALESCE($5, status),
            no_of_materials = COALESCE($6, no_of_materials),
            sequence = COALESCE($7, sequence),
            updated_at = NOW()
         WHERE id = $8
         RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(payload.name)
    .bind(payload.code)
    .bind(payload.description)
    .bind(payload.version)
    .bind(payload.status.map(|s| s.as_str()))
    .bind(payload.no_of_materials)
    .bind(payload.sequence)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Duplicate entry: code already exists"))?
    .ok_or_else(|| AppError::not_found("Recipe not found"))?;

    Ok(Json(RecipeResponse::from(recipe)))
}

// DELETE /recipes/:id
//
// Cascade in FK-safe order inside one transaction: production orders
// referencing the recipe, then its dosing records, then the recipe. Any
// failure rolls the whole chain back.
#[instrument(skip(state), fields(id))]
pub async fn delete_recipe(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("Recipe not found"));
    }

    sqlx::query("DELETE FROM production_orders WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipe_materials WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(recipe_id = id, "recipe and related data deleted");
    Ok(Json(serde_json::json!({
        "message": "Recipe and related data deleted successfully"
    })))
}

// POST /recipe_materials
//
// Upsert keyed on (recipe_id, material_id). A manual `actual` skips the
// device; `use_scale` reads it instead.
#[instrument(skip(state, payload))]
pub async fn upsert_recipe_material(
    State(state): State<AppState>,
    Json(payload): Json<UpsertRecipeMaterialRequest>,
) -> Result<(StatusCode, Json<UpsertRecipeMaterialResponse>), AppError> {
    if payload.recipe_id <= 0 || payload.material_id <= 0 {
        return Err(AppError::validation("recipe_id and material_id must be positive integers"));
    }
    if !payload.set_point.is_finite() || payload.set_point < 0.0 {
        return Err(AppError::validation("set_point must be a non-negative number"));
    }
    // Required explicitly: defaulting here would let a repeat POST drag an
    // already-dosed record back to `pending`.
    let status = payload
        .status
        .ok_or_else(|| AppError::validation("'status' is required"))?;

    let actual = if payload.use_scale {
        state.scale.read_net_weight().await?
    } else {
        payload.actual.ok_or_else(|| {
            AppError::validation(
                "Actual weight is required. Either provide 'actual' or set 'use_scale' to true",
            )
        })?
    };
    if !actual.is_finite() {
        return Err(AppError::validation("actual must be a numeric value"));
    }

    let recipe_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE id = $1")
        .bind(payload.recipe_id)
        .fetch_one(&state.db_pool)
        .await?;
    if recipe_exists == 0 {
        return Err(AppError::validation("Recipe not found"));
    }
    let material_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE id = $1")
        .bind(payload.material_id)
        .fetch_one(&state.db_pool)
        .await?;
    if material_exists == 0 {
        return Err(AppError::validation("Material not found"));
    }
    if let Some(bucket_id) = payload.bucket_id {
        let bucket_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storage_buckets WHERE id = $1")
                .bind(bucket_id)
                .fetch_one(&state.db_pool)
                .await?;
        if bucket_exists == 0 {
            return Err(AppError::validation("Invalid bucket_id. Bucket not found"));
        }
    }

    let margin = dosing::percentage_margin(payload.set_point, actual);

    let existing_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM recipe_materials WHERE recipe_id = $1 AND material_id = $2",
    )
    .bind(payload.recipe_id)
    .bind(payload.material_id)
    .fetch_optional(&state.db_pool)
    .await?;

    let (record, created) = match existing_id {
        Some(id) => {
            // Serialize with concurrent captures on the same record.
            let _guard = state.dosing_locks.acquire(id).await;
            let record = sqlx::query_as::<_, RecipeMaterial>(&format!(
                "UPDATE recipe_materials
                 SET set_point = $1, actual = $2, margin = $3, status = $4, bucket_id = $5
                 WHERE id = $6
                 RETURNING {RECIPE_MATERIAL_COLUMNS}"
            ))
            .bind(payload.set_point)
            .bind(actual)
            .bind(margin)
            .bind(status.as_str())
            .bind(payload.bucket_id)
            .bind(id)
            .fetch_one(&state.db_pool)
            .await?;
            (record, false)
        }
        None => {
            let record = sqlx::query_as::<_, RecipeMaterial>(&format!(
                "INSERT INTO recipe_materials
                    (recipe_id, material_id, set_point, actual, margin, status, bucket_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {RECIPE_MATERIAL_COLUMNS}"
            ))
            .bind(payload.recipe_id)
            .bind(payload.material_id)
            .bind(payload.set_point)
            .bind(actual)
            .bind(margin)
            .bind(status.as_str())
            .bind(payload.bucket_id)
            .fetch_one(&state.db_pool)
            .await?;
            (record, true)
        }
    };

    info!(
        recipe_material_id = record.id,
        recipe_id = payload.recipe_id,
        material_id = payload.material_id,
        scale_used = payload.use_scale,
        created,
        "recipe material upserted"
    );

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(UpsertRecipeMaterialResponse {
            recipe_material: RecipeMaterialResponse::from(record),
            scale_used: payload.use_scale,
        }),
    ))
}

// GET /recipe_materials
#[instrument(skip(state))]
pub async fn get_recipe_materials(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecipeMaterialResponse>>, AppError> {
    let records = sqlx::query_as::<_, RecipeMaterial>(&format!(
        "SELECT {RECIPE_MATERIAL_COLUMNS} FROM recipe_materials ORDER BY id"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(records.into_iter().map(RecipeMaterialResponse::from).collect()))
}

// GET /recipe_materials/recipe/:recipe_id
#[instrument(skip(state), fields(recipe_id))]
pub async fn get_recipe_materials_by_recipe(
    Path(recipe_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<RecipeMaterialResponse>>, AppError> {
    let records = sqlx::query_as::<_, RecipeMaterial>(&format!(
        "SELECT {RECIPE_MATERIAL_COLUMNS} FROM recipe_materials WHERE recipe_id = $1 ORDER BY id"
    ))
    .bind(recipe_id)
    .fetch_all(&state.db_pool)
    .await?;

    if records.is_empty() {
        return Err(AppError::not_found("No materials found for this recipe"));
    }
    Ok(Json(records.into_iter().map(RecipeMaterialResponse::from).collect()))
}

// PUT /recipe_materials/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_recipe_material(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateRecipeMaterialRequest>,
) -> Result<Json<RecipeMaterialResponse>, AppError> {
    let _guard = state.dosing_locks.acquire(id).await;

    if let Some(material_id) = payload.material_id {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE id = $1")
            .bind(material_id)
            .fetch_one(&state.db_pool)
            .await?;
        if exists == 0 {
            return Err(AppError::validation("Material not found"));
        }
    }

    let record = sqlx::query_as::<_, RecipeMaterial>(&format!(
        "UPDATE recipe_materials SET
            material_id = COALESCE($1, material_id),
            set_point = COALESCE($2, set_point),
            bucket_id = COALESCE($3, bucket_id),
            status = COALESCE($4, status)
         WHERE id = $5
         RETURNING {RECIPE_MATERIAL_COLUMNS}"
    ))
    .bind(payload.material_id)
    .bind(payload.set_point)
    .bind(payload.bucket_id)
    .bind(payload.status.map(|s| s.as_str()))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Recipe material not found"))?;

    Ok(Json(RecipeMaterialResponse::from(record)))
}

// DELETE /recipe_materials/:id
#[instrument(skip(state), fields(id))]
pub async fn delete_recipe_material(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let _guard = state.dosing_locks.acquire(id).await;

    let result = sqlx::query("DELETE FROM recipe_materials WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Recipe material not found"));
    }

    warn!(recipe_material_id = id, "recipe material deleted");
    Ok(Json(serde_json::json!({
        "message": "Recipe material deleted successfully"
    })))
}

// POST /recipe_materials/:id/capture_weight
#[instrument(skip(state), fields(id))]
pub async fn capture_weight_for_recipe_material(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CaptureResponse>, AppError> {
    capture_for_record(&state, id).await.map(Json)
}
