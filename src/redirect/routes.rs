use axum::{routing::get, Router};
use std::sync::Arc;

use crate::analytics::TransitionRecorder;
use crate::config::ProxyConfig;
use crate::storage::Storage;

use super::handlers::{redirect_link, RedirectState};

pub fn create_redirect_router(
    storage: Arc<dyn Storage>,
    recorder: Arc<TransitionRecorder>,
    proxy: ProxyConfig,
) -> Router {
    let state = Arc::new(RedirectState {
        storage,
        recorder,
        proxy,
    });

    Router::new()
        .route("/links/{short_link}/", get(redirect_link))
        .route("/links/{short_link}", get(redirect_link))
        .with_state(state)
}
