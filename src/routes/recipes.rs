use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::recipe::{
    capture_weight_for_recipe_material, create_recipe, delete_recipe, delete_recipe_material,
    get_paginated_recipes, get_recipe, get_recipe_materials, get_recipe_materials_by_recipe,
    get_recipes, update_recipe, update_recipe_material, upsert_recipe_material,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(get_recipes).post(create_recipe))
        .route("/recipes/paginated", get(get_paginated_recipes))
        .route(
            "/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipe_materials",
            get(get_recipe_materials).post(upsert_recipe_material),
        )
        .route(
            "/recipe_materials/recipe/{recipe_id}",
            get(get_recipe_materials_by_recipe),
        )
        .route(
            "/recipe_materials/{id}",
            axum::routing::put(update_recipe_material).delete(delete_recipe_material),
        )
        .route(
            "/recipe_materials/{id}/capture_weight",
            post(capture_weight_for_recipe_material),
        )
}
