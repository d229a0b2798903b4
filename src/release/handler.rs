//! HTTP handlers for the release engine's trigger paths
//!
//! The sweep endpoint mirrors the product's scheduler hook: callers
//! (cron, ops) POST to it and get the batch counts back. Both routes
//! are intended for trusted internal callers behind the gateway.

use crate::api::error_response;
use crate::release::sweeper::ReleaseSweeper;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Shared state for release handlers
#[derive(Clone)]
pub struct ReleaseState {
    pub sweeper: Arc<ReleaseSweeper>,
}

/// Create the release router
pub fn release_router(state: ReleaseState) -> Router {
    Router::new()
        .route("/api/v1/scheduler/check-releases", post(check_releases))
        .route(
            "/api/v1/owners/:owner_id/death-confirmation",
            post(confirm_death),
        )
        .with_state(state)
}

/// POST /api/v1/scheduler/check-releases
async fn check_releases(State(state): State<ReleaseState>) -> impl IntoResponse {
    match state.sweeper.run_once().await {
        Ok(report) => Json(serde_json::json!({
            "message": "Scheduled release check completed",
            "processed": report.processed,
            "released": report.released,
        }))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/v1/owners/:ownerId/death-confirmation
async fn confirm_death(
    State(state): State<ReleaseState>,
    Path(owner_id): Path<String>,
) -> impl IntoResponse {
    match state.sweeper.on_death_confirmed(&owner_id).await {
        Ok(report) => Json(serde_json::json!({
            "ownerId": owner_id,
            "processed": report.processed,
            "released": report.released,
        }))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SweeperConfig;
    use crate::notify::LogNotifier;
    use crate::vault::store::{FileVaultStore, VaultStore};
    use crate::vault::types::{ContentKind, Memory, ReleasePolicy};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn make_app() -> (Router, Arc<FileVaultStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileVaultStore::new(dir.path().to_path_buf()).await.unwrap());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        ));
        let sweeper = Arc::new(ReleaseSweeper::new(
            store.clone(),
            clock,
            Arc::new(LogNotifier),
            SweeperConfig::default(),
        ));
        let state = ReleaseState { sweeper };
        (release_router(state), store, dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn seed(owner: &str, policy: ReleasePolicy) -> Memory {
        Memory {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            title: "m".to_string(),
            content_kind: ContentKind::Text,
            content_ref: "blob://m".to_string(),
            size_bytes: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            explicit_release_at: None,
            is_public: false,
            shared_with: Default::default(),
            policy: Some(policy),
            encryption: None,
        }
    }

    #[tokio::test]
    async fn test_check_releases_counts() {
        let (app, store, _dir) = make_app().await;
        store
            .put_memory(seed("owner-1", ReleasePolicy::HoldForDays { days: 30 }))
            .await
            .unwrap();

        let trigger = || {
            Request::builder()
                .method("POST")
                .uri("/api/v1/scheduler/check-releases")
                .body(Body::empty())
                .unwrap()
        };

        let resp = app.clone().oneshot(trigger()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["processed"], 1);
        assert_eq!(json["released"], 1);

        // Second trigger releases nothing new
        let resp = app.oneshot(trigger()).await.unwrap();
        assert_eq!(body_json(resp).await["released"], 0);
    }

    #[tokio::test]
    async fn test_death_confirmation_endpoint() {
        let (app, store, _dir) = make_app().await;
        store
            .put_memory(seed("owner-1", ReleasePolicy::HoldUntilDeath))
            .await
            .unwrap();

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/owners/owner-1/death-confirmation")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["released"], 1);
        assert!(store.death_status("owner-1").await.unwrap().is_confirmed());
    }
}
