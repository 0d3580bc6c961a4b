use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use crate::models::{CreateLinkRequest, CreateLinkResponse, LinkStatistics};
use crate::storage::Storage;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<MessageResponse>);

pub fn message(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
}

pub fn link_not_found() -> ApiError {
    message(StatusCode::NOT_FOUND, "Link not found")
}

pub fn internal_error() -> ApiError {
    message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Only absolute http(s) URLs with a host can be redirected to. The link is
/// stored as given, so it must also be usable verbatim as a `Location` value.
fn validate_original_link(original_link: &str) -> Result<(), &'static str> {
    // Url::parse strips tabs and newlines instead of rejecting them
    if original_link.chars().any(char::is_control) {
        return Err("original_link must not contain control characters");
    }

    let url = Url::parse(original_link)
        .map_err(|_| "original_link must be an absolute URL including http:// or https://")?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err("original_link must use the http or https scheme");
    }

    if url.host().is_none() {
        return Err("original_link must include a host");
    }

    Ok(())
}

/// Create a new short link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<Json<CreateLinkResponse>, ApiError> {
    if let Err(reason) = validate_original_link(&payload.original_link) {
        return Err(message(StatusCode::BAD_REQUEST, reason));
    }

    match state.storage.create_link(&payload.original_link).await {
        Ok(link) => {
            info!(short_link = %link.short_link, "link created");
            Ok(Json(link.into()))
        }
        Err(e) => {
            error!(error = %e, "failed to create link");
            Err(internal_error())
        }
    }
}

/// Statistics for the link owning `access_key`
pub async fn get_link_stats(
    State(state): State<Arc<AppState>>,
    Path(access_key): Path<String>,
) -> Result<Json<LinkStatistics>, ApiError> {
    let link = match state.storage.get_link_by_access_key(&access_key).await {
        Ok(Some(link)) => link,
        Ok(None) => return Err(link_not_found()),
        Err(e) => {
            error!(error = %e, "failed to look up link by access key");
            return Err(internal_error());
        }
    };

    match state.storage.get_link_stats(&link).await {
        Ok(stats) => Ok(Json(LinkStatistics::new(
            link.original_link,
            link.short_link,
            stats,
        ))),
        Err(e) => {
            error!(short_link = %link.short_link, error = %e, "failed to compute link statistics");
            Err(internal_error())
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "OK".to_string(),
    })
}
