// Presentation layer - HTTP surface
pub mod app_state;
pub mod context;
pub mod errors;
pub mod handlers;

use crate::presentation::app_state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/timers/evaluate", post(handlers::evaluate_timers))
        .route("/completion/classify", post(handlers::classify_completion))
        .route("/reports/daily-detail", get(handlers::daily_detail))
        .route("/reports/tips", get(handlers::tip_report))
        .route("/tickets/auto-approve", post(handlers::auto_approve))
        .route("/tickets/:id/timers/stream", get(handlers::stream_ticket_timers))
        .with_state(state)
}
