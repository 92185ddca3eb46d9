use crate::state::AppState;
use axum::{routing::get, Router};

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod stats;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/exams",
            get(handlers::list_exams).post(handlers::create_exam),
        )
        .route("/exams/statistics", get(handlers::statistics))
        .route(
            "/exams/:id",
            get(handlers::get_exam)
                .put(handlers::update_exam)
                .delete(handlers::delete_exam),
        )
}
