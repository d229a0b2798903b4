//! Vault store with file-based JSON persistence
//!
//! The engine talks to the store only through the [`VaultStore`] trait;
//! the bundled [`FileVaultStore`] keeps every collection in memory under
//! `tokio::sync::RwLock` and mirrors each record to a JSON file.
//!
//! Directory layout:
//! ```text
//! <data_dir>/
//! ├── memories/<memory-id>.json
//! ├── contacts/<contact-id>.json
//! ├── profiles/<owner-id>.json
//! ├── share_links/<token>.json
//! ├── releases/<memory-id>@<gate-ts>.json
//! └── deaths/<owner-id>.json
//! ```

use crate::error::Result;
use crate::vault::types::{
    DeathStatus, Memory, ProfileDefaults, ReleaseRecord, ShareLink, TrustedContact,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence seam for the release engine.
///
/// The "record release" write is the idempotency mechanism for the
/// sweeper: it is a single atomic conditional insert, so only the first
/// writer for a given (memory, gate time) succeeds and late writers
/// observe it already recorded.
#[async_trait]
pub trait VaultStore: Send + Sync {
    // Memories
    async fn put_memory(&self, memory: Memory) -> Result<()>;
    async fn memory(&self, id: &Uuid) -> Result<Option<Memory>>;
    async fn list_memories(&self) -> Result<Vec<Memory>>;
    async fn memories_by_owner(&self, owner_id: &str) -> Result<Vec<Memory>>;
    async fn remove_memory(&self, id: &Uuid) -> Result<Option<Memory>>;

    // Profile defaults
    async fn profile_defaults(&self, owner_id: &str) -> Result<ProfileDefaults>;
    async fn set_profile_defaults(&self, owner_id: &str, defaults: ProfileDefaults) -> Result<()>;

    // Trusted contacts
    async fn trusted_contacts(&self, owner_id: &str) -> Result<Vec<TrustedContact>>;
    async fn put_trusted_contact(&self, contact: TrustedContact) -> Result<()>;
    async fn remove_trusted_contact(
        &self,
        owner_id: &str,
        contact_id: &Uuid,
    ) -> Result<Option<TrustedContact>>;

    // Share links
    /// Insert a link; returns false without overwriting if the token is
    /// already taken (issuer retries with fresh randomness)
    async fn insert_share_link(&self, link: ShareLink) -> Result<bool>;
    async fn share_link(&self, token: &str) -> Result<Option<ShareLink>>;
    async fn remove_share_link(&self, token: &str) -> Result<Option<ShareLink>>;

    // Death confirmation
    async fn death_status(&self, owner_id: &str) -> Result<DeathStatus>;
    /// Record confirmation; idempotent — a second confirmation keeps the
    /// original timestamp. Returns the effective status.
    async fn confirm_death(&self, owner_id: &str, at: DateTime<Utc>) -> Result<DeathStatus>;

    // Release records
    /// Atomic conditional insert keyed by memory id + gate time.
    /// Returns true only for the first writer.
    async fn record_release(&self, record: ReleaseRecord) -> Result<bool>;
    async fn release_recorded(&self, memory_id: &Uuid, gate_time: DateTime<Utc>) -> Result<bool>;
    /// Compensation for a claim whose release event could not be emitted;
    /// the memory becomes eligible again on the next sweep
    async fn clear_release(&self, memory_id: &Uuid, gate_time: DateTime<Utc>) -> Result<()>;
}

/// In-memory store mirrored to JSON files
pub struct FileVaultStore {
    base_dir: PathBuf,
    memories: Arc<RwLock<HashMap<Uuid, Memory>>>,
    profiles: Arc<RwLock<HashMap<String, ProfileDefaults>>>,
    contacts: Arc<RwLock<HashMap<Uuid, TrustedContact>>>,
    share_links: Arc<RwLock<HashMap<String, ShareLink>>>,
    deaths: Arc<RwLock<HashMap<String, DeathStatus>>>,
    releases: Arc<RwLock<HashMap<String, ReleaseRecord>>>,
}

const MEMORIES_DIR: &str = "memories";
const PROFILES_DIR: &str = "profiles";
const CONTACTS_DIR: &str = "contacts";
const SHARE_LINKS_DIR: &str = "share_links";
const DEATHS_DIR: &str = "deaths";
const RELEASES_DIR: &str = "releases";

impl FileVaultStore {
    /// Create a store at the given base directory, loading existing state
    pub async fn new(base_dir: PathBuf) -> std::io::Result<Self> {
        for dir in [
            MEMORIES_DIR,
            PROFILES_DIR,
            CONTACTS_DIR,
            SHARE_LINKS_DIR,
            DEATHS_DIR,
            RELEASES_DIR,
        ] {
            tokio::fs::create_dir_all(base_dir.join(dir)).await?;
        }

        let store = Self {
            base_dir,
            memories: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            contacts: Arc::new(RwLock::new(HashMap::new())),
            share_links: Arc::new(RwLock::new(HashMap::new())),
            deaths: Arc::new(RwLock::new(HashMap::new())),
            releases: Arc::new(RwLock::new(HashMap::new())),
        };

        store.load_from_disk().await;
        Ok(store)
    }

    async fn load_from_disk(&self) {
        let memories: Vec<Memory> = load_dir(&self.base_dir.join(MEMORIES_DIR)).await;
        let mut map = self.memories.write().await;
        for m in memories {
            map.insert(m.id, m);
        }
        drop(map);

        let contacts: Vec<TrustedContact> = load_dir(&self.base_dir.join(CONTACTS_DIR)).await;
        let mut map = self.contacts.write().await;
        for c in contacts {
            map.insert(c.id, c);
        }
        drop(map);

        let links: Vec<ShareLink> = load_dir(&self.base_dir.join(SHARE_LINKS_DIR)).await;
        let mut map = self.share_links.write().await;
        for l in links {
            map.insert(l.token.clone(), l);
        }
        drop(map);

        let releases: Vec<ReleaseRecord> = load_dir(&self.base_dir.join(RELEASES_DIR)).await;
        let mut map = self.releases.write().await;
        for r in releases {
            map.insert(ReleaseRecord::key(&r.memory_id, r.gate_time), r);
        }
        drop(map);

        // Profiles and deaths are keyed by file stem (owner id)
        let profiles: Vec<(String, ProfileDefaults)> =
            load_dir_keyed(&self.base_dir.join(PROFILES_DIR)).await;
        let mut map = self.profiles.write().await;
        for (owner, p) in profiles {
            map.insert(owner, p);
        }
        drop(map);

        let deaths: Vec<(String, DeathStatus)> =
            load_dir_keyed(&self.base_dir.join(DEATHS_DIR)).await;
        let mut map = self.deaths.write().await;
        for (owner, d) in deaths {
            map.insert(owner, d);
        }
    }

    async fn persist<T: serde::Serialize>(&self, dir: &str, name: &str, value: &T) {
        let path = self.base_dir.join(dir).join(format!("{}.json", name));
        match serde_json::to_string_pretty(value) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&path, json).await {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to persist record");
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to serialize record");
            }
        }
    }

    async fn unlink(&self, dir: &str, name: &str) {
        let path = self.base_dir.join(dir).join(format!("{}.json", name));
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove record file");
            }
        }
    }
}

/// Load every `*.json` record in a directory, skipping unreadable files
async fn load_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Vec<T> {
    let mut out = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => out.push(value),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping malformed record")
                }
            },
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
        }
    }
    out
}

/// Like `load_dir` but pairs each record with its file stem
async fn load_dir_keyed<T: serde::de::DeserializeOwned>(dir: &Path) -> Vec<(String, T)> {
    let mut out = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => out.push((stem, value)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping malformed record")
                }
            },
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
        }
    }
    out
}

#[async_trait]
impl VaultStore for FileVaultStore {
    async fn put_memory(&self, memory: Memory) -> Result<()> {
        let id = memory.id;
        self.memories.write().await.insert(id, memory.clone());
        self.persist(MEMORIES_DIR, &id.to_string(), &memory).await;
        Ok(())
    }

    async fn memory(&self, id: &Uuid) -> Result<Option<Memory>> {
        Ok(self.memories.read().await.get(id).cloned())
    }

    async fn list_memories(&self) -> Result<Vec<Memory>> {
        Ok(self.memories.read().await.values().cloned().collect())
    }

    async fn memories_by_owner(&self, owner_id: &str) -> Result<Vec<Memory>> {
        Ok(self
            .memories
            .read()
            .await
            .values()
            .filter(|m| m.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn remove_memory(&self, id: &Uuid) -> Result<Option<Memory>> {
        let removed = self.memories.write().await.remove(id);
        if removed.is_some() {
            self.unlink(MEMORIES_DIR, &id.to_string()).await;
        }
        Ok(removed)
    }

    async fn profile_defaults(&self, owner_id: &str) -> Result<ProfileDefaults> {
        Ok(self
            .profiles
            .read()
            .await
            .get(owner_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_profile_defaults(&self, owner_id: &str, defaults: ProfileDefaults) -> Result<()> {
        self.profiles
            .write()
            .await
            .insert(owner_id.to_string(), defaults.clone());
        self.persist(PROFILES_DIR, owner_id, &defaults).await;
        Ok(())
    }

    async fn trusted_contacts(&self, owner_id: &str) -> Result<Vec<TrustedContact>> {
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn put_trusted_contact(&self, contact: TrustedContact) -> Result<()> {
        let id = contact.id;
        self.contacts.write().await.insert(id, contact.clone());
        self.persist(CONTACTS_DIR, &id.to_string(), &contact).await;
        Ok(())
    }

    async fn remove_trusted_contact(
        &self,
        owner_id: &str,
        contact_id: &Uuid,
    ) -> Result<Option<TrustedContact>> {
        let mut contacts = self.contacts.write().await;
        let matches_owner = contacts
            .get(contact_id)
            .map(|c| c.owner_id == owner_id)
            .unwrap_or(false);
        if !matches_owner {
            return Ok(None);
        }
        let removed = contacts.remove(contact_id);
        drop(contacts);
        self.unlink(CONTACTS_DIR, &contact_id.to_string()).await;
        Ok(removed)
    }

    async fn insert_share_link(&self, link: ShareLink) -> Result<bool> {
        let mut links = self.share_links.write().await;
        if links.contains_key(&link.token) {
            return Ok(false);
        }
        links.insert(link.token.clone(), link.clone());
        drop(links);
        self.persist(SHARE_LINKS_DIR, &link.token, &link).await;
        Ok(true)
    }

    async fn share_link(&self, token: &str) -> Result<Option<ShareLink>> {
        Ok(self.share_links.read().await.get(token).cloned())
    }

    async fn remove_share_link(&self, token: &str) -> Result<Option<ShareLink>> {
        let removed = self.share_links.write().await.remove(token);
        if removed.is_some() {
            self.unlink(SHARE_LINKS_DIR, token).await;
        }
        Ok(removed)
    }

    async fn death_status(&self, owner_id: &str) -> Result<DeathStatus> {
        Ok(self
            .deaths
            .read()
            .await
            .get(owner_id)
            .copied()
            .unwrap_or_default())
    }

    async fn confirm_death(&self, owner_id: &str, at: DateTime<Utc>) -> Result<DeathStatus> {
        let mut deaths = self.deaths.write().await;
        let status = deaths
            .entry(owner_id.to_string())
            .or_insert(DeathStatus::Unconfirmed);
        if !status.is_confirmed() {
            *status = DeathStatus::ConfirmedAt { at };
        }
        let effective = *status;
        drop(deaths);
        self.persist(DEATHS_DIR, owner_id, &effective).await;
        Ok(effective)
    }

    async fn record_release(&self, record: ReleaseRecord) -> Result<bool> {
        let key = ReleaseRecord::key(&record.memory_id, record.gate_time);
        let mut releases = self.releases.write().await;
        if releases.contains_key(&key) {
            return Ok(false);
        }
        releases.insert(key.clone(), record.clone());
        drop(releases);
        self.persist(RELEASES_DIR, &key, &record).await;
        Ok(true)
    }

    async fn release_recorded(&self, memory_id: &Uuid, gate_time: DateTime<Utc>) -> Result<bool> {
        let key = ReleaseRecord::key(memory_id, gate_time);
        Ok(self.releases.read().await.contains_key(&key))
    }

    async fn clear_release(&self, memory_id: &Uuid, gate_time: DateTime<Utc>) -> Result<()> {
        let key = ReleaseRecord::key(memory_id, gate_time);
        if self.releases.write().await.remove(&key).is_some() {
            self.unlink(RELEASES_DIR, &key).await;
        }
        Ok(())
    }
}
