pub mod materials;
pub mod production;
pub mod recipes;
pub mod scale;
pub mod storage_buckets;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(materials::routes())
        .merge(recipes::routes())
        .merge(production::routes())
        .merge(storage_buckets::routes())
        .merge(users::routes())
        .nest("/scale", scale::routes())
}
