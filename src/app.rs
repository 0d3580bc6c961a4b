use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::analytics::TransitionRecorder;
use crate::api::create_api_router;
use crate::config::ProxyConfig;
use crate::redirect::create_redirect_router;
use crate::storage::Storage;

/// The full HTTP surface: link creation, statistics and redirects
pub fn create_app(
    storage: Arc<dyn Storage>,
    recorder: Arc<TransitionRecorder>,
    proxy: ProxyConfig,
) -> Router {
    create_api_router(Arc::clone(&storage))
        .merge(create_redirect_router(storage, recorder, proxy))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
