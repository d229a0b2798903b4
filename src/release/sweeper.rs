//! Release sweeper
//!
//! Periodic batch pass promoting memories whose time-based gate has
//! newly elapsed, plus the death-confirmation trigger path. Both reuse
//! the same claim-then-emit discipline: the store's conditional
//! "record release" insert is the idempotency mechanism, so overlapping
//! sweep runs never double-fire and no cross-sweep lock is needed.

use crate::clock::Clock;
use crate::config::SweeperConfig;
use crate::error::Result;
use crate::notify::{Notifier, ReleaseNotice};
use crate::release::policy;
use crate::vault::store::VaultStore;
use crate::vault::types::{Memory, ReleasePolicy, ReleaseRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Counts returned by a sweep run
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Gate-bearing memories examined
    pub processed: u64,
    /// Release events emitted this run
    pub released: u64,
}

/// Periodic release job. Best-effort per memory: one failure is logged
/// and skipped, never aborting the batch.
pub struct ReleaseSweeper {
    store: Arc<dyn VaultStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: SweeperConfig,
}

impl ReleaseSweeper {
    pub fn new(
        store: Arc<dyn VaultStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            config,
        }
    }

    /// One sweep pass over all time-gated memories.
    ///
    /// `HoldUntilDeath` memories are never touched here; they transition
    /// only via [`ReleaseSweeper::on_death_confirmed`].
    pub async fn run_once(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let memories = self.store.list_memories().await?;

        let mut report = SweepReport::default();
        for memory in memories {
            match self.sweep_one(&memory, now).await {
                Ok(Some(released)) => {
                    report.processed += 1;
                    if released {
                        report.released += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    report.processed += 1;
                    tracing::warn!(
                        memory_id = %memory.id,
                        error = %e,
                        "Sweep failed for memory; will retry next run"
                    );
                }
            }
        }

        tracing::debug!(
            processed = report.processed,
            released = report.released,
            "Release sweep complete"
        );
        Ok(report)
    }

    /// Returns None if the memory carries no timer-swept gate,
    /// Some(released) otherwise.
    async fn sweep_one(&self, memory: &Memory, now: DateTime<Utc>) -> Result<Option<bool>> {
        let defaults = self.store.profile_defaults(&memory.owner_id).await?;
        let resolved = policy::resolve(memory, &defaults);
        if !resolved.swept_by_timer() {
            return Ok(None);
        }

        let gate = match resolved.ready_at {
            Some(gate) if gate <= now => gate,
            _ => return Ok(Some(false)),
        };

        let released = self.release(memory, gate, now).await?;
        Ok(Some(released))
    }

    /// Death-confirmation trigger: records the signal and releases the
    /// owner's `HoldUntilDeath` memories with the same emit-once
    /// discipline as the timer sweep.
    pub async fn on_death_confirmed(&self, owner_id: &str) -> Result<SweepReport> {
        let now = self.clock.now();
        let status = self.store.confirm_death(owner_id, now).await?;
        // Idempotent: a repeat confirmation keeps the original gate time,
        // so already-released memories are skipped by the record check.
        let gate = status.confirmed_at().unwrap_or(now);

        let mut report = SweepReport::default();
        for memory in self.store.memories_by_owner(owner_id).await? {
            let defaults = self.store.profile_defaults(&memory.owner_id).await?;
            let resolved = policy::resolve(&memory, &defaults);
            if resolved.policy != ReleasePolicy::HoldUntilDeath {
                continue;
            }
            report.processed += 1;
            match self.release(&memory, gate, now).await {
                Ok(true) => report.released += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        memory_id = %memory.id,
                        error = %e,
                        "Death-triggered release failed for memory"
                    );
                }
            }
        }

        tracing::info!(
            owner_id = %owner_id,
            released = report.released,
            "Death confirmation processed"
        );
        Ok(report)
    }

    /// Claim the release record, then emit. Only the first claimant
    /// emits; if emission fails the claim is rolled back so the next
    /// sweep retries.
    async fn release(&self, memory: &Memory, gate: DateTime<Utc>, now: DateTime<Utc>) -> Result<bool> {
        let record = ReleaseRecord {
            memory_id: memory.id,
            gate_time: gate,
            released_at: now,
        };
        if !self.store.record_release(record).await? {
            return Ok(false);
        }

        let notice = ReleaseNotice::released(
            memory.id,
            &memory.owner_id,
            self.recipients(memory).await?,
            now,
        );
        if let Err(e) = self.notifier.notify(&notice).await {
            self.store.clear_release(&memory.id, gate).await?;
            return Err(e);
        }
        Ok(true)
    }

    /// Shared-with viewers plus the owner's trusted contacts, deduplicated
    async fn recipients(&self, memory: &Memory) -> Result<Vec<String>> {
        let mut recipients: std::collections::BTreeSet<String> =
            memory.shared_with.iter().cloned().collect();
        for contact in self.store.trusted_contacts(&memory.owner_id).await? {
            recipients.insert(contact.contact_user_id);
        }
        recipients.remove(&memory.owner_id);
        Ok(recipients.into_iter().collect())
    }

    /// Spawn the periodic sweep loop
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval_secs = self.config.interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match self.run_once().await {
                    Ok(report) if report.released > 0 => {
                        tracing::info!(
                            processed = report.processed,
                            released = report.released,
                            "Release sweep promoted memories"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Release sweep run failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::testing::CapturingNotifier;
    use crate::vault::store::FileVaultStore;
    use crate::vault::types::{ContactRole, ContentKind, TrustedContact};
    use chrono::TimeZone;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<FileVaultStore>,
        clock: Arc<ManualClock>,
        notifier: Arc<CapturingNotifier>,
        sweeper: ReleaseSweeper,
        _dir: TempDir,
    }

    async fn fixture(start: DateTime<Utc>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileVaultStore::new(dir.path().to_path_buf()).await.unwrap());
        let clock = Arc::new(ManualClock::new(start));
        let notifier = Arc::new(CapturingNotifier::default());
        let sweeper = ReleaseSweeper::new(
            store.clone(),
            clock.clone(),
            notifier.clone(),
            SweeperConfig::default(),
        );
        Fixture {
            store,
            clock,
            notifier,
            sweeper,
            _dir: dir,
        }
    }

    fn memory(owner: &str, policy: ReleasePolicy) -> Memory {
        Memory {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            title: "m".to_string(),
            content_kind: ContentKind::Audio,
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
    async fn test_sweep_releases_elapsed_gate_once() {
        let f = fixture(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()).await;

        let mut m = memory("owner-1", ReleasePolicy::HoldForDays { days: 30 });
        m.shared_with.insert("friend-1".to_string());
        f.store.put_memory(m).await.unwrap();

        // Gate not yet reached: processed but not released
        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.released, 0);

        f.clock.set(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.released, 1);

        // Idempotence: an immediate second run releases nothing
        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.released, 0);
        assert_eq!(f.notifier.notices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_death_gated_memories_skipped_by_timer() {
        let f = fixture(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()).await;
        f.store
            .put_memory(memory("owner-1", ReleasePolicy::HoldUntilDeath))
            .await
            .unwrap();
        f.store
            .put_memory(memory("owner-1", ReleasePolicy::Immediate))
            .await
            .unwrap();

        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.released, 0);
    }

    #[tokio::test]
    async fn test_death_confirmation_releases_once() {
        let f = fixture(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()).await;

        let m = memory("owner-1", ReleasePolicy::HoldUntilDeath);
        f.store.put_memory(m).await.unwrap();
        // Another owner's death-gated memory must be untouched
        let other = memory("owner-2", ReleasePolicy::HoldUntilDeath);
        f.store.put_memory(other).await.unwrap();

        let report = f.sweeper.on_death_confirmed("owner-1").await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.released, 1);

        // Repeat confirmation fires nothing new
        f.clock.advance(chrono::Duration::days(1));
        let report = f.sweeper.on_death_confirmed("owner-1").await.unwrap();
        assert_eq!(report.released, 0);
        assert_eq!(f.notifier.notices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recipients_include_trusted_contacts() {
        let f = fixture(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()).await;

        let mut m = memory("owner-1", ReleasePolicy::HoldForDays { days: 7 });
        m.shared_with.insert("friend-1".to_string());
        f.store.put_memory(m).await.unwrap();
        f.store
            .put_trusted_contact(TrustedContact {
                id: Uuid::new_v4(),
                owner_id: "owner-1".to_string(),
                contact_user_id: "executor-1".to_string(),
                role: ContactRole::Executor,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            })
            .await
            .unwrap();

        f.sweeper.run_once().await.unwrap();
        let notices = f.notifier.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        let mut recipients = notices[0].recipients.clone();
        recipients.sort();
        assert_eq!(recipients, vec!["executor-1", "friend-1"]);
    }

    #[tokio::test]
    async fn test_notify_failure_retried_next_sweep() {
        let f = fixture(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()).await;
        f.store
            .put_memory(memory("owner-1", ReleasePolicy::HoldForDays { days: 7 }))
            .await
            .unwrap();

        f.notifier
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.released, 0);

        // Delivery recovers; the unrecorded memory is picked up again
        f.notifier
            .fail
            .store(false, std::sync::atomic::Ordering::SeqCst);
        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.released, 1);
    }

    #[tokio::test]
    async fn test_explicit_release_at_swept() {
        let f = fixture(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()).await;

        let mut m = memory("owner-1", ReleasePolicy::Immediate);
        m.explicit_release_at = Some(Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap());
        f.store.put_memory(m).await.unwrap();

        let report = f.sweeper.run_once().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.released, 1);
    }
}
