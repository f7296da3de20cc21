use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::scale::{capture_weight, get_net_weight, start_dosing};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/net-weight", get(get_net_weight))
        .route("/capture/{recipe_material_id}", post(capture_weight))
        .route("/start-dosing/{id}", post(start_dosing))
}
