pub mod health;
pub mod middleware;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/matching",
            get(handlers::handle_list_matchings).post(handlers::handle_save_matching),
        )
        .route(
            "/api/v1/matching/",
            get(handlers::handle_list_matchings).post(handlers::handle_save_matching),
        )
        .route(
            "/api/v1/matching/summary/:summary_id",
            get(handlers::handle_get_by_summary),
        )
        .route("/api/v1/matching/bulk/", post(handlers::handle_bulk_create))
        .route(
            "/api/v1/matching/:id",
            get(handlers::handle_get_matching).put(handlers::handle_update_matching),
        )
        .with_state(state)
}
