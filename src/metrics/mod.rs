use crate::state::AppState;
use axum::{routing::get, Router};

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/metrics",
            get(handlers::list_metrics).post(handlers::create_metric),
        )
        .route("/metrics/data", get(handlers::metric_data))
        .route(
            "/metrics/:id",
            get(handlers::get_metric)
                .put(handlers::update_metric)
                .delete(handlers::delete_metric),
        )
}
