//! HTTP handlers for share links
//!
//! The `/shared/:token` path is the anonymous capability entry point;
//! it never consults the viewer header.

use crate::api::{error_response, missing_viewer, viewer_from_headers};
use crate::release::access::Decision;
use crate::sharing::{ShareLinkAccess, ShareLinkService};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Shared state for share-link handlers
#[derive(Clone)]
pub struct SharingState {
    pub links: Arc<ShareLinkService>,
}

/// Create the sharing router
pub fn sharing_router(state: SharingState) -> Router {
    Router::new()
        .route("/api/v1/memories/:id/share-links", post(issue_link))
        .route("/api/v1/share-links/:token", delete(revoke_link))
        .route("/api/v1/shared/:token", get(open_shared))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueLinkRequest {
    ttl_secs: i64,
}

/// POST /api/v1/memories/:id/share-links
async fn issue_link(
    State(state): State<SharingState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<IssueLinkRequest>,
) -> impl IntoResponse {
    let Some(viewer) = viewer_from_headers(&headers) else {
        return missing_viewer().into_response();
    };
    match state.links.issue(&viewer, &id, request.ttl_secs).await {
        Ok(link) => (StatusCode::CREATED, Json(link)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// DELETE /api/v1/share-links/:token
async fn revoke_link(
    State(state): State<SharingState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(viewer) = viewer_from_headers(&headers) else {
        return missing_viewer().into_response();
    };
    match state.links.revoke(&viewer, &token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/v1/shared/:token
async fn open_shared(
    State(state): State<SharingState>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    match state.links.verify(&token).await {
        Ok(ShareLinkAccess::Granted(memory)) => Json(memory).into_response(),
        Ok(ShareLinkAccess::Gated(reason)) => (
            StatusCode::FORBIDDEN,
            Json(serde_json::to_value(Decision::deny(reason)).unwrap_or_default()),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
