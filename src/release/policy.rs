//! Release policy resolver
//!
//! Pure computation of a memory's effective release rule from its policy
//! snapshot (or, for records without one, the owner's profile defaults).
//! Never fails: unrecognized policy tags fall back to `Immediate`, which
//! fails open on the time gate only — sharing checks are unaffected.

use crate::vault::types::{DefaultRelease, Memory, ProfileDefaults, ReleasePolicy};
use chrono::{DateTime, Duration, Utc};

/// A memory's effective release rule plus its concrete gate instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub policy: ReleasePolicy,
    /// Gate instant for time-gated release; None = no time gate
    pub ready_at: Option<DateTime<Utc>>,
}

impl ResolvedRelease {
    /// Whether the time gate (if any) has passed at `now`
    pub fn time_gate_open(&self, now: DateTime<Utc>) -> bool {
        self.ready_at.map(|gate| now >= gate).unwrap_or(true)
    }

    /// Whether this rule is promoted by the timer sweep (as opposed to
    /// the death-confirmation trigger)
    pub fn swept_by_timer(&self) -> bool {
        self.policy != ReleasePolicy::HoldUntilDeath && self.ready_at.is_some()
    }
}

/// Resolve the effective release rule for a memory.
///
/// `explicit_release_at`, when set, replaces the policy-computed gate
/// time outright — the owner's explicit instruction wins whether it is
/// earlier or later. It never affects the death gate.
pub fn resolve(memory: &Memory, defaults: &ProfileDefaults) -> ResolvedRelease {
    let policy = normalize(
        memory
            .policy
            .clone()
            .unwrap_or_else(|| from_defaults(defaults)),
    );

    let ready_at = match &policy {
        ReleasePolicy::Immediate => None,
        ReleasePolicy::HoldUntilDeath => None,
        ReleasePolicy::HoldForDays { days } => Some(memory.created_at + Duration::days(*days)),
    };

    let ready_at = if policy == ReleasePolicy::HoldUntilDeath {
        None
    } else {
        memory.explicit_release_at.or(ready_at)
    };

    ResolvedRelease { policy, ready_at }
}

/// Seed a policy snapshot at memory creation time. Profile-default
/// changes after creation never alter existing snapshots.
pub fn snapshot_at_creation(
    requested: Option<ReleasePolicy>,
    defaults: &ProfileDefaults,
) -> ReleasePolicy {
    normalize(requested.unwrap_or_else(|| from_defaults(defaults)))
}

fn from_defaults(defaults: &ProfileDefaults) -> ReleasePolicy {
    match defaults.default_release {
        DefaultRelease::Immediate | DefaultRelease::Unknown => ReleasePolicy::Immediate,
        DefaultRelease::UntilDeath => ReleasePolicy::HoldUntilDeath,
        DefaultRelease::AfterDays => ReleasePolicy::HoldForDays {
            days: defaults.default_release_after_days.unwrap_or(0),
        },
    }
}

fn normalize(policy: ReleasePolicy) -> ReleasePolicy {
    match policy {
        ReleasePolicy::HoldForDays { days } if days <= 0 => ReleasePolicy::Immediate,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::types::ContentKind;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn memory_with(policy: Option<ReleasePolicy>) -> Memory {
        Memory {
            id: Uuid::new_v4(),
            owner_id: "owner-1".to_string(),
            title: "m".to_string(),
            content_kind: ContentKind::Photo,
            content_ref: "blob://m".to_string(),
            size_bytes: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            explicit_release_at: None,
            is_public: false,
            shared_with: Default::default(),
            policy,
            encryption: None,
        }
    }

    #[test]
    fn test_snapshot_wins_over_defaults() {
        let defaults = ProfileDefaults {
            default_release: DefaultRelease::UntilDeath,
            default_release_after_days: None,
        };
        let memory = memory_with(Some(ReleasePolicy::Immediate));
        let resolved = resolve(&memory, &defaults);
        assert_eq!(resolved.policy, ReleasePolicy::Immediate);
        assert!(resolved.ready_at.is_none());
    }

    #[test]
    fn test_hold_for_days_gate_time() {
        let memory = memory_with(Some(ReleasePolicy::HoldForDays { days: 30 }));
        let resolved = resolve(&memory, &ProfileDefaults::default());
        assert_eq!(
            resolved.ready_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap())
        );
        assert!(!resolved.time_gate_open(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()));
        assert!(resolved.time_gate_open(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_non_positive_days_is_immediate() {
        for days in [0, -5] {
            let memory = memory_with(Some(ReleasePolicy::HoldForDays { days }));
            let resolved = resolve(&memory, &ProfileDefaults::default());
            assert_eq!(resolved.policy, ReleasePolicy::Immediate);
            assert!(resolved.ready_at.is_none());
        }
    }

    #[test]
    fn test_defaults_seed_when_no_snapshot() {
        let defaults = ProfileDefaults {
            default_release: DefaultRelease::AfterDays,
            default_release_after_days: Some(7),
        };
        let resolved = resolve(&memory_with(None), &defaults);
        assert_eq!(resolved.policy, ReleasePolicy::HoldForDays { days: 7 });

        // Unknown tag falls back to Immediate
        let unknown = ProfileDefaults {
            default_release: DefaultRelease::Unknown,
            default_release_after_days: Some(7),
        };
        let resolved = resolve(&memory_with(None), &unknown);
        assert_eq!(resolved.policy, ReleasePolicy::Immediate);
    }

    #[test]
    fn test_explicit_override_replaces_gate_both_directions() {
        // Later than the policy gate: delays
        let mut memory = memory_with(Some(ReleasePolicy::HoldForDays { days: 30 }));
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        memory.explicit_release_at = Some(late);
        assert_eq!(resolve(&memory, &ProfileDefaults::default()).ready_at, Some(late));

        // Earlier than the policy gate: the explicit instruction still wins
        let early = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        memory.explicit_release_at = Some(early);
        assert_eq!(resolve(&memory, &ProfileDefaults::default()).ready_at, Some(early));

        // Even an Immediate policy becomes time-gated by the override
        let mut memory = memory_with(Some(ReleasePolicy::Immediate));
        memory.explicit_release_at = Some(late);
        let resolved = resolve(&memory, &ProfileDefaults::default());
        assert_eq!(resolved.ready_at, Some(late));
        assert!(resolved.swept_by_timer());
    }

    #[test]
    fn test_death_gate_ignores_explicit_override() {
        let mut memory = memory_with(Some(ReleasePolicy::HoldUntilDeath));
        memory.explicit_release_at = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let resolved = resolve(&memory, &ProfileDefaults::default());
        assert_eq!(resolved.policy, ReleasePolicy::HoldUntilDeath);
        assert!(resolved.ready_at.is_none());
        assert!(!resolved.swept_by_timer());
    }
}
