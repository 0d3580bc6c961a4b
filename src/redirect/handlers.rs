use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

use crate::analytics::{extract_client_ip, TransitionRecorder};
use crate::api::handlers::{internal_error, link_not_found};
use crate::config::ProxyConfig;
use crate::storage::Storage;

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub recorder: Arc<TransitionRecorder>,
    pub proxy: ProxyConfig,
}

/// Redirect to the original link and record the visit in the background
pub async fn redirect_link(
    State(state): State<Arc<RedirectState>>,
    Path(short_link): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let link = match state.storage.get_link_by_short_link(&short_link).await {
        Ok(Some(link)) => link,
        Ok(None) => return link_not_found().into_response(),
        Err(e) => {
            error!(short_link = %short_link, error = %e, "failed to look up link");
            return internal_error().into_response();
        }
    };

    // Only a redirect that can actually be sent counts as a transition
    let location = match HeaderValue::from_str(&link.original_link) {
        Ok(location) => location,
        Err(e) => {
            error!(short_link = %short_link, error = %e, "stored link is not a valid Location");
            return internal_error().into_response();
        }
    };

    let client_ip = extract_client_ip(&headers, addr.ip(), &state.proxy);
    let referrer = headers
        .get(header::REFERER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    // Not awaited: the response goes out while the transition is enriched
    state.recorder.dispatch(link, client_ip, referrer);

    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}
