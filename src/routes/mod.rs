use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod insights;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(insights::router())
}
