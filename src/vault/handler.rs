//! HTTP handlers for memories, profile defaults, and trusted contacts
//!
//! Every read goes through the access evaluator; owner-only mutations
//! check ownership before touching the store.

use crate::api::{error_response, missing_viewer, viewer_from_headers};
use crate::clock::Clock;
use crate::release::access::{self, AccessEvaluator, Decision};
use crate::release::policy;
use crate::vault::store::VaultStore;
use crate::vault::types::{
    CreateContactRequest, CreateMemoryRequest, Memory, ProfileDefaults, TrustedContact,
    UpdateSharingRequest,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared state for vault handlers
#[derive(Clone)]
pub struct VaultState {
    pub store: Arc<dyn VaultStore>,
    pub evaluator: Arc<AccessEvaluator>,
    pub clock: Arc<dyn Clock>,
}

/// Create the vault router
pub fn vault_router(state: VaultState) -> Router {
    Router::new()
        .route("/api/v1/memories", post(create_memory).get(list_memories))
        .route("/api/v1/memories/:id", get(get_memory))
        .route("/api/v1/memories/:id/sharing", put(update_sharing))
        .route(
            "/api/v1/owners/:owner_id/profile-defaults",
            get(get_profile_defaults).put(put_profile_defaults),
        )
        .route(
            "/api/v1/owners/:owner_id/trusted-contacts",
            get(list_contacts).post(create_contact),
        )
        .route(
            "/api/v1/owners/:owner_id/trusted-contacts/:contact_id",
            axum::routing::delete(delete_contact),
        )
        .with_state(state)
}

fn deny_response(decision: Decision) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::to_value(decision).unwrap_or_default()),
    )
}

// =============================================================================
// Memories
// =============================================================================

/// POST /api/v1/memories
async fn create_memory(
    State(state): State<VaultState>,
    headers: HeaderMap,
    Json(request): Json<CreateMemoryRequest>,
) -> impl IntoResponse {
    let Some(owner) = viewer_from_headers(&headers) else {
        return missing_viewer().into_response();
    };

    let defaults = match state.store.profile_defaults(&owner).await {
        Ok(d) => d,
        Err(e) => return error_response(&e).into_response(),
    };

    let memory = Memory {
        id: Uuid::new_v4(),
        owner_id: owner,
        title: request.title,
        content_kind: request.content_kind,
        content_ref: request.content_ref,
        size_bytes: request.size_bytes,
        created_at: state.clock.now(),
        explicit_release_at: request.explicit_release_at,
        is_public: request.is_public,
        shared_with: request.shared_with,
        policy: Some(policy::snapshot_at_creation(request.policy, &defaults)),
        encryption: request.encryption,
    };

    match state.store.put_memory(memory.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(memory)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/v1/memories
async fn list_memories(State(state): State<VaultState>, headers: HeaderMap) -> impl IntoResponse {
    let viewer = viewer_from_headers(&headers);
    match state.evaluator.visible_memories(viewer.as_deref()).await {
        Ok(memories) => {
            let total = memories.len();
            Json(serde_json::json!({
                "memories": memories,
                "total": total,
            }))
            .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/v1/memories/:id
async fn get_memory(
    State(state): State<VaultState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let viewer = viewer_from_headers(&headers);
    match state.evaluator.evaluate(viewer.as_deref(), &id).await {
        Ok(Decision::Allow) => match state.store.memory(&id).await {
            Ok(Some(memory)) => Json(memory).into_response(),
            Ok(None) => error_response(&crate::error::Error::NotFound(format!("memory {}", id)))
                .into_response(),
            Err(e) => error_response(&e).into_response(),
        },
        Ok(deny) => deny_response(deny).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// PUT /api/v1/memories/:id/sharing
async fn update_sharing(
    State(state): State<VaultState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateSharingRequest>,
) -> impl IntoResponse {
    let Some(viewer) = viewer_from_headers(&headers) else {
        return missing_viewer().into_response();
    };

    let mut memory = match state.store.memory(&id).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            return error_response(&crate::error::Error::NotFound(format!("memory {}", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    };

    let decision = access::check_owner(Some(&viewer), &memory);
    if !decision.is_allow() {
        return deny_response(decision).into_response();
    }

    if let Some(is_public) = request.is_public {
        memory.is_public = is_public;
    }
    if let Some(shared_with) = request.shared_with {
        memory.shared_with = shared_with;
    }
    if request.clear_explicit_release_at {
        memory.explicit_release_at = None;
    } else if let Some(at) = request.explicit_release_at {
        memory.explicit_release_at = Some(at);
    }

    match state.store.put_memory(memory.clone()).await {
        Ok(()) => Json(memory).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// =============================================================================
// Profile defaults
// =============================================================================

/// GET /api/v1/owners/:ownerId/profile-defaults
async fn get_profile_defaults(
    State(state): State<VaultState>,
    Path(owner_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match require_self(&headers, &owner_id) {
        Ok(()) => {}
        Err(resp) => return resp,
    }
    match state.store.profile_defaults(&owner_id).await {
        Ok(defaults) => Json(defaults).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// PUT /api/v1/owners/:ownerId/profile-defaults
async fn put_profile_defaults(
    State(state): State<VaultState>,
    Path(owner_id): Path<String>,
    headers: HeaderMap,
    Json(defaults): Json<ProfileDefaults>,
) -> impl IntoResponse {
    match require_self(&headers, &owner_id) {
        Ok(()) => {}
        Err(resp) => return resp,
    }
    match state.store.set_profile_defaults(&owner_id, defaults.clone()).await {
        Ok(()) => Json(defaults).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// =============================================================================
// Trusted contacts
// =============================================================================

/// GET /api/v1/owners/:ownerId/trusted-contacts
async fn list_contacts(
    State(state): State<VaultState>,
    Path(owner_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match require_self(&headers, &owner_id) {
        Ok(()) => {}
        Err(resp) => return resp,
    }
    match state.store.trusted_contacts(&owner_id).await {
        Ok(contacts) => Json(serde_json::json!({ "trustedContacts": contacts })).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/v1/owners/:ownerId/trusted-contacts
async fn create_contact(
    State(state): State<VaultState>,
    Path(owner_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateContactRequest>,
) -> impl IntoResponse {
    match require_self(&headers, &owner_id) {
        Ok(()) => {}
        Err(resp) => return resp,
    }

    let contact = TrustedContact {
        id: Uuid::new_v4(),
        owner_id,
        contact_user_id: request.contact_user_id,
        role: request.role,
        created_at: state.clock.now(),
    };
    match state.store.put_trusted_contact(contact.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(contact)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// DELETE /api/v1/owners/:ownerId/trusted-contacts/:contactId
async fn delete_contact(
    State(state): State<VaultState>,
    Path((owner_id, contact_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match require_self(&headers, &owner_id) {
        Ok(()) => {}
        Err(resp) => return resp,
    }
    match state.store.remove_trusted_contact(&owner_id, &contact_id).await {
        Ok(Some(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(None) => error_response(&crate::error::Error::NotFound(format!(
            "trusted contact {}",
            contact_id
        )))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// Owner-scoped routes require the viewer to be the owner in the path
fn require_self(headers: &HeaderMap, owner_id: &str) -> Result<(), axum::response::Response> {
    match viewer_from_headers(headers) {
        None => Err(missing_viewer().into_response()),
        Some(viewer) if viewer == owner_id => Ok(()),
        Some(_) => Err(deny_response(Decision::deny(
            crate::release::access::DenyReason::NotOwner,
        ))
        .into_response()),
    }
}
