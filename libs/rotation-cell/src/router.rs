use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::CursorStore;

#[derive(Clone)]
pub struct RotationState {
    pub config: Arc<AppConfig>,
    pub cursor: Arc<dyn CursorStore>,
}

pub fn rotation_routes(config: Arc<AppConfig>, cursor: Arc<dyn CursorStore>) -> Router {
    let state = RotationState {
        config: config.clone(),
        cursor,
    };

    Router::new()
        .route("/assign", post(handlers::assign_doctor))
        .route("/sequence", get(handlers::get_sequence))
        .route("/cursor/reset", post(handlers::reset_cursor))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
