//! Access evaluator
//!
//! The single entry point deciding, for any (viewer, memory) pair,
//! whether the memory is currently visible. Every read flows through
//! here so the ordered-check contract holds uniformly instead of being
//! re-implemented per call site.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::release::policy::{self, ResolvedRelease};
use crate::vault::store::VaultStore;
use crate::vault::types::{DeathStatus, Memory, ReleasePolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Why a viewer was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotOwner,
    TimeGateNotReached,
    NotShared,
    DeathNotConfirmed,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOwner => write!(f, "not_owner"),
            Self::TimeGateNotReached => write!(f, "time_gate_not_reached"),
            Self::NotShared => write!(f, "not_shared"),
            Self::DeathNotConfirmed => write!(f, "death_not_confirmed"),
        }
    }
}

/// Outcome of an access evaluation. A `Deny` is a normal result value,
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny { reason: DenyReason },
}

impl Decision {
    pub fn deny(reason: DenyReason) -> Self {
        Self::Deny { reason }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Ordered, short-circuiting visibility check.
///
/// Owner bypass first, then the two global gates (death, time) before
/// the relation-specific checks: a failed global gate must deny everyone
/// uniformly, so sharing membership is never consulted before the gates.
pub fn check(
    viewer: Option<&str>,
    memory: &Memory,
    resolved: &ResolvedRelease,
    death: DeathStatus,
    now: DateTime<Utc>,
) -> Decision {
    if viewer == Some(memory.owner_id.as_str()) {
        return Decision::Allow;
    }

    if resolved.policy == ReleasePolicy::HoldUntilDeath && !death.is_confirmed() {
        return Decision::deny(DenyReason::DeathNotConfirmed);
    }

    if !resolved.time_gate_open(now) {
        return Decision::deny(DenyReason::TimeGateNotReached);
    }

    if memory.is_public {
        return Decision::Allow;
    }

    if let Some(viewer) = viewer {
        if memory.shared_with.contains(viewer) {
            return Decision::Allow;
        }
    }

    Decision::deny(DenyReason::NotShared)
}

/// Owner check for owner-only mutations (sharing updates, link issuance)
pub fn check_owner(viewer: Option<&str>, memory: &Memory) -> Decision {
    if viewer == Some(memory.owner_id.as_str()) {
        Decision::Allow
    } else {
        Decision::deny(DenyReason::NotOwner)
    }
}

/// Store-backed evaluator. Stateless between calls; safe to invoke
/// concurrently across viewers.
pub struct AccessEvaluator {
    store: Arc<dyn VaultStore>,
    clock: Arc<dyn Clock>,
}

impl AccessEvaluator {
    pub fn new(store: Arc<dyn VaultStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Evaluate access for a memory id; `NotFound` if the memory is missing
    pub async fn evaluate(&self, viewer: Option<&str>, memory_id: &Uuid) -> Result<Decision> {
        let memory = self
            .store
            .memory(memory_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("memory {}", memory_id)))?;
        self.evaluate_memory(viewer, &memory).await
    }

    /// Evaluate access for an already-loaded memory
    pub async fn evaluate_memory(&self, viewer: Option<&str>, memory: &Memory) -> Result<Decision> {
        let defaults = self.store.profile_defaults(&memory.owner_id).await?;
        let death = self.store.death_status(&memory.owner_id).await?;
        let resolved = policy::resolve(memory, &defaults);
        Ok(check(viewer, memory, &resolved, death, self.clock.now()))
    }

    /// All memories currently visible to the viewer
    pub async fn visible_memories(&self, viewer: Option<&str>) -> Result<Vec<Memory>> {
        let memories = self.store.list_memories().await?;
        let decisions = futures::future::try_join_all(
            memories.iter().map(|m| self.evaluate_memory(viewer, m)),
        )
        .await?;
        Ok(memories
            .into_iter()
            .zip(decisions)
            .filter(|(_, decision)| decision.is_allow())
            .map(|(memory, _)| memory)
            .collect())
    }
}
