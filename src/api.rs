//! Unified API router for Heirloom
//!
//! Merges the module routers into a single axum `Router` with CORS and
//! request tracing. The authenticated viewer id arrives in the
//! `x-viewer-id` header, set by the upstream identity gateway; absence
//! means an anonymous viewer.
//!
//! ## Endpoint Map
//!
//! | Route                                         | Module  | Description                  |
//! |-----------------------------------------------|---------|------------------------------|
//! | `GET  /health`                                | api     | Load balancer health probe   |
//! | `POST /api/v1/memories`                       | vault   | Create memory                |
//! | `GET  /api/v1/memories`                       | vault   | List memories visible to viewer |
//! | `GET  /api/v1/memories/:id`                   | vault   | Gated single fetch           |
//! | `PUT  /api/v1/memories/:id/sharing`           | vault   | Owner sharing update         |
//! | `GET/PUT /api/v1/owners/:id/profile-defaults` | vault   | Release defaults             |
//! | `*    /api/v1/owners/:id/trusted-contacts`    | vault   | Trusted contacts CRUD        |
//! | `POST /api/v1/memories/:id/share-links`       | sharing | Issue share link             |
//! | `DELETE /api/v1/share-links/:token`           | sharing | Revoke share link            |
//! | `GET  /api/v1/shared/:token`                  | sharing | Verify + gated fetch         |
//! | `POST /api/v1/scheduler/check-releases`       | release | Manual sweep trigger         |
//! | `POST /api/v1/owners/:id/death-confirmation`  | release | Death-confirmation signal    |

use crate::error::Error;
use crate::release::handler::{release_router, ReleaseState};
use crate::sharing::{sharing_router, SharingState};
use crate::vault::handler::{vault_router, VaultState};
use axum::{
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Header carrying the authenticated viewer id
pub const VIEWER_HEADER: &str = "x-viewer-id";

/// Build the complete Heirloom HTTP application
pub fn build_app(
    vault_state: VaultState,
    sharing_state: SharingState,
    release_state: ReleaseState,
    cors_origins: &[String],
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(vault_router(vault_state))
        .merge(sharing_router(sharing_state))
        .merge(release_router(release_state))
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Extract the viewer id supplied by the identity gateway
pub(crate) fn viewer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(VIEWER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Map an engine error onto an HTTP response body
pub(crate) fn error_response(error: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let (status, code) = match error {
        Error::Unauthorized(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::Expired(_) => (StatusCode::GONE, "EXPIRED"),
        Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        Error::Store(_) | Error::Io(_) | Error::Http(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "STORE_ERROR")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    };
    (
        status,
        Json(serde_json::json!({
            "error": { "code": code, "message": error.to_string() }
        })),
    )
}

/// 401 for endpoints that require an authenticated viewer
pub(crate) fn missing_viewer() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": { "code": "UNAUTHENTICATED", "message": "x-viewer-id header required" }
        })),
    )
}

// =============================================================================
// Root handlers
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static(VIEWER_HEADER),
        ]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<header::HeaderValue> =
            origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let resp = health_check().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_viewer_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(viewer_from_headers(&headers).is_none());

        headers.insert(VIEWER_HEADER, "user-1".parse().unwrap());
        assert_eq!(viewer_from_headers(&headers).as_deref(), Some("user-1"));

        headers.insert(VIEWER_HEADER, "".parse().unwrap());
        assert!(viewer_from_headers(&headers).is_none());
    }

    #[test]
    fn test_error_response_mapping() {
        let (status, _) = error_response(&Error::Expired("link".into()));
        assert_eq!(status, StatusCode::GONE);

        let (status, _) = error_response(&Error::Validation("ttl".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&Error::Store("down".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_build_cors_with_origins() {
        let _cors = build_cors(&[]);
        let _cors = build_cors(&["http://localhost:3000".to_string()]);
    }
}
