use axum::{routing::get, Router};
use crate::handlers::storage::{create_bucket, get_bucket, get_buckets};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/storage_buckets", get(get_buckets).post(create_bucket))
        .route("/storage_buckets/{id}", get(get_bucket))
}
