//! Vault data model
//!
//! Wire types for memories, trusted contacts, share links, and the
//! per-owner death-confirmation state. All types use camelCase JSON
//! serialization on the API surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Release rule attached to a memory.
///
/// Exactly one variant is active per memory at evaluation time. Memories
/// store a snapshot of this value at creation; later changes to the
/// owner's profile defaults never alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Visible to authorized viewers as soon as created
    Immediate,
    /// Visible only after the owner's death has been confirmed
    HoldUntilDeath,
    /// Visible once `created_at + days` has passed
    HoldForDays { days: i64 },
}

/// Profile-level default release setting, used only to seed a memory's
/// policy snapshot at creation when the memory carries no override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRelease {
    Immediate,
    UntilDeath,
    AfterDays,
    /// Unrecognized tag from an older record; resolves as Immediate
    /// (fail open on the time gate only, never on sharing)
    #[serde(other)]
    Unknown,
}

/// Per-user release defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDefaults {
    pub default_release: DefaultRelease,
    pub default_release_after_days: Option<i64>,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            default_release: DefaultRelease::Immediate,
            default_release_after_days: None,
        }
    }
}

/// Kind of content a memory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Video,
    Audio,
    Photo,
    Text,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Photo => write!(f, "photo"),
            Self::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "photo" => Ok(Self::Photo),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

/// A single owned content item with release controls.
///
/// `created_at` is immutable after creation. `explicit_release_at`,
/// `is_public`, and `shared_with` are mutable only by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub content_kind: ContentKind,
    /// Opaque storage pointer; file storage is a separate collaborator
    pub content_ref: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    /// Owner-set hard override of the policy-computed gate time
    #[serde(default)]
    pub explicit_release_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub shared_with: HashSet<String>,
    /// Policy snapshot taken at creation; None for records predating
    /// snapshots, resolved from profile defaults instead
    #[serde(default)]
    pub policy: Option<ReleasePolicy>,
    /// Opaque encryption metadata, pass-through only
    #[serde(default)]
    pub encryption: Option<serde_json::Value>,
}

/// Role tag for a trusted contact. Descriptive metadata only; roles do
/// not themselves grant read access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    Executor,
    Family,
    Friend,
    Attorney,
}

impl std::fmt::Display for ContactRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executor => write!(f, "executor"),
            Self::Family => write!(f, "family"),
            Self::Friend => write!(f, "friend"),
            Self::Attorney => write!(f, "attorney"),
        }
    }
}

impl std::str::FromStr for ContactRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executor" => Ok(Self::Executor),
            "family" => Ok(Self::Family),
            "friend" => Ok(Self::Friend),
            "attorney" => Ok(Self::Attorney),
            other => Err(format!("unknown contact role: {}", other)),
        }
    }
}

/// Directed owner → trusted user relation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedContact {
    pub id: Uuid,
    pub owner_id: String,
    pub contact_user_id: String,
    pub role: ContactRole,
    pub created_at: DateTime<Utc>,
}

/// Time-limited capability granting read access to one memory.
///
/// Stateless between issue and expiry: not consumed on first use,
/// repeat viewing within the window is supported unless revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub token: String,
    pub memory_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Per-owner death-confirmation signal.
///
/// Tagged rather than a bare bool so the confirmation timestamp is
/// preserved as an audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeathStatus {
    Unconfirmed,
    ConfirmedAt { at: DateTime<Utc> },
}

impl DeathStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::ConfirmedAt { .. })
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::ConfirmedAt { at } => Some(*at),
            Self::Unconfirmed => None,
        }
    }
}

impl Default for DeathStatus {
    fn default() -> Self {
        Self::Unconfirmed
    }
}

/// Record that a memory's release event has been emitted.
///
/// The idempotency key is memory id + gate time: repeated sweeps and
/// overlapping sweep instances never double-fire for the same gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub memory_id: Uuid,
    pub gate_time: DateTime<Utc>,
    pub released_at: DateTime<Utc>,
}

impl ReleaseRecord {
    /// Idempotency key for this record
    pub fn key(memory_id: &Uuid, gate_time: DateTime<Utc>) -> String {
        format!("{}@{}", memory_id, gate_time.timestamp())
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// Request body for creating a memory
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemoryRequest {
    pub title: String,
    pub content_kind: ContentKind,
    pub content_ref: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    /// Explicit per-item policy; omitted = seed from profile defaults
    #[serde(default)]
    pub policy: Option<ReleasePolicy>,
    #[serde(default)]
    pub explicit_release_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub shared_with: HashSet<String>,
    #[serde(default)]
    pub encryption: Option<serde_json::Value>,
}

/// Request body for owner updates to sharing state
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSharingRequest {
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub shared_with: Option<HashSet<String>>,
    #[serde(default)]
    pub explicit_release_at: Option<DateTime<Utc>>,
    /// Clear the explicit override entirely
    #[serde(default)]
    pub clear_explicit_release_at: bool,
}

/// Request body for adding a trusted contact
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub contact_user_id: String,
    pub role: ContactRole,
}
