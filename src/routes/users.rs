use axum::{routing::get, Router};
use crate::handlers::user::{create_user, get_users};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/users", get(get_users).post(create_user))
}
