pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ranking::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/jobs/rank", post(handlers::handle_rank_jobs))
        .route(
            "/api/v1/resumes/keywords",
            post(handlers::handle_resume_keywords),
        )
        .with_state(state)
}
