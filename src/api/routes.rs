use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::storage::Storage;

use super::handlers::{create_link, get_link_stats, health_check, AppState};

pub fn create_api_router(storage: Arc<dyn Storage>) -> Router {
    let state = Arc::new(AppState { storage });

    Router::new()
        .route("/health", get(health_check))
        .route("/links/create/", post(create_link))
        .route("/links/create", post(create_link))
        .route("/stats/{access_key}/", get(get_link_stats))
        .route("/stats/{access_key}", get(get_link_stats))
        .with_state(state)
}
