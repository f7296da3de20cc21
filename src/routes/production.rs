use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers::production::{
    complete_dispensing, create_batch, create_dispensing, create_order, delete_batch,
    delete_dispensing, delete_order, get_batch, get_batch_readiness, get_batches, get_dispensing_records, get_order,
    get_orders, reject_order, update_batch, update_dispensing, update_order,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/production_orders", get(get_orders).post(create_order))
        .route(
            "/production_orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/production_orders/{id}/reject", put(reject_order))
        .route("/batches", get(get_batches).post(create_batch))
        .route(
            "/batches/{id}",
            get(get_batch).put(update_batch).delete(delete_batch),
        )
        .route("/batches/{id}/readiness", get(get_batch_readiness))
        .route(
            "/batch_dispensing",
            get(get_dispensing_records).post(create_dispensing),
        )
        .route(
            "/batch_dispensing/{id}",
            put(update_dispensing).delete(delete_dispensing),
        )
        .route("/batch_dispensing/{id}/complete", post(complete_dispensing))
}
