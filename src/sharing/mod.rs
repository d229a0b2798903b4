//! Share-link issuance and verification
//!
//! Opaque, expiring capability tokens scoped to one memory. A valid,
//! unexpired link bypasses the ownership/sharing checks by design, but
//! still honors the memory's death and time gates: a link can never
//! reveal content before its policy allows it.

mod handler;

pub use handler::{sharing_router, SharingState};

use crate::clock::Clock;
use crate::config::ShareLinkConfig;
use crate::error::{Error, Result};
use crate::release::access::DenyReason;
use crate::release::policy;
use crate::vault::store::VaultStore;
use crate::vault::types::{Memory, ReleasePolicy, ShareLink};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of verifying a share link. A gate that has not opened yet is
/// a normal result value, not an error.
#[derive(Debug, Clone)]
pub enum ShareLinkAccess {
    Granted(Memory),
    Gated(DenyReason),
}

/// Issues, verifies, and revokes share links
pub struct ShareLinkService {
    store: Arc<dyn VaultStore>,
    clock: Arc<dyn Clock>,
    config: ShareLinkConfig,
}

impl ShareLinkService {
    pub fn new(store: Arc<dyn VaultStore>, clock: Arc<dyn Clock>, config: ShareLinkConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Issue a link for a memory the caller owns.
    ///
    /// Out-of-range ttl is a validation error, never silently clamped.
    pub async fn issue(&self, caller: &str, memory_id: &Uuid, ttl_secs: i64) -> Result<ShareLink> {
        if ttl_secs < self.config.min_ttl_secs || ttl_secs > self.config.max_ttl_secs {
            return Err(Error::Validation(format!(
                "ttl {}s outside allowed range {}s..={}s",
                ttl_secs, self.config.min_ttl_secs, self.config.max_ttl_secs
            )));
        }

        let memory = self
            .store
            .memory(memory_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("memory {}", memory_id)))?;
        if memory.owner_id != caller {
            return Err(Error::Unauthorized(
                "only the owner may issue share links".to_string(),
            ));
        }

        let now = self.clock.now();
        let expires_at = now + Duration::seconds(ttl_secs);

        // Token collisions are vanishingly rare at 256 bits; on one,
        // regenerate rather than overwrite the existing link.
        for _ in 0..5 {
            let link = ShareLink {
                token: self.generate_token(),
                memory_id: *memory_id,
                created_at: now,
                expires_at,
            };
            if self.store.insert_share_link(link.clone()).await? {
                tracing::debug!(memory_id = %memory_id, expires_at = %expires_at, "Issued share link");
                return Ok(link);
            }
        }
        Err(Error::Store(
            "could not allocate a unique share token".to_string(),
        ))
    }

    /// Verify a token and perform the gated fetch.
    ///
    /// `NotFound` for unknown (or revoked) tokens, `Expired` past the
    /// ttl; a successful lookup still passes through the memory's death
    /// and time gates.
    pub async fn verify(&self, token: &str) -> Result<ShareLinkAccess> {
        let link = self
            .store
            .share_link(token)
            .await?
            .ok_or_else(|| Error::NotFound("share link".to_string()))?;

        let now = self.clock.now();
        if now > link.expires_at {
            return Err(Error::Expired("share link".to_string()));
        }

        let memory = self
            .store
            .memory(&link.memory_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("memory {}", link.memory_id)))?;

        let defaults = self.store.profile_defaults(&memory.owner_id).await?;
        let death = self.store.death_status(&memory.owner_id).await?;
        let resolved = policy::resolve(&memory, &defaults);

        if resolved.policy == ReleasePolicy::HoldUntilDeath && !death.is_confirmed() {
            return Ok(ShareLinkAccess::Gated(DenyReason::DeathNotConfirmed));
        }
        if !resolved.time_gate_open(now) {
            return Ok(ShareLinkAccess::Gated(DenyReason::TimeGateNotReached));
        }

        Ok(ShareLinkAccess::Granted(memory))
    }

    /// Owner-only early invalidation
    pub async fn revoke(&self, caller: &str, token: &str) -> Result<()> {
        let link = self
            .store
            .share_link(token)
            .await?
            .ok_or_else(|| Error::NotFound("share link".to_string()))?;
        let memory = self
            .store
            .memory(&link.memory_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("memory {}", link.memory_id)))?;
        if memory.owner_id != caller {
            return Err(Error::Unauthorized(
                "only the owner may revoke share links".to_string(),
            ));
        }
        self.store.remove_share_link(token).await?;
        tracing::debug!(memory_id = %memory.id, "Revoked share link");
        Ok(())
    }

    fn generate_token(&self) -> String {
        let mut bytes = vec![0u8; self.config.token_bytes.max(16)];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(&bytes)
    }
}
