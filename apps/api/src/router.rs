use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use rotation_cell::{rotation_routes, CursorStore};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, cursor: Arc<dyn CursorStore>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic rotation API is running!" }))
        .nest("/rotation", rotation_routes(state, cursor))
}
