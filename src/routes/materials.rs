use axum::{routing::get, Router};
use crate::handlers::material::{
    create_material, create_transaction, delete_material, get_all_materials, get_material,
    get_material_by_barcode, get_materials, get_transaction, get_transactions, update_material,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/materials", get(get_materials).post(create_material))
        .route("/materials/all", get(get_all_materials))
        .route("/materials/barcode/{barcode}", get(get_material_by_barcode))
        .route(
            "/materials/{id}",
            get(get_material).put(update_material).delete(delete_material),
        )
        .route(
            "/material-transactions",
            get(get_transactions).post(create_transaction),
        )
        .route("/material-transactions/{id}", get(get_transaction))
}
