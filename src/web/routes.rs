use super::handlers;
use super::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::public::index))
        .route("/post/:uid", get(handlers::public::post))
        .route("/api/exit-preview", get(handlers::public::exit_preview))
        .fallback(handlers::public::not_found)
}
