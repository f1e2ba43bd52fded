//! Hot-reloadable suppression rules.
//!
//! The current [`RuleSet`] lives behind an `RwLock<Arc<_>>`. Readers clone
//! the `Arc` under a shared lock and then work on an immutable snapshot;
//! a patch builds a complete new set and swaps the pointer, so a reader sees
//! either the old or the new set and never a mix.

use std::sync::Arc;

use parking_lot::RwLock;
use triage_core::error::CoreError;
use triage_core::rules::{RulePatch, RuleSet};

/// Owner of the current rule set.
#[derive(Debug)]
pub struct RuleEngine {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleEngine {
    pub fn new(initial: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Snapshot of the latest committed rule set.
    pub fn current(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read())
    }

    /// Merge `patch` into the current set and publish the result.
    ///
    /// Concurrent patches are serialized so none is lost. On a validation
    /// error the current set is left untouched.
    pub fn patch(&self, patch: &RulePatch) -> Result<Arc<RuleSet>, CoreError> {
        let mut current = self.current.write();
        let next = Arc::new(current.apply(patch)?);
        *current = Arc::clone(&next);

        tracing::info!(
            max_per_hour = next.max_per_hour,
            max_per_day = next.max_per_day,
            quiet_start = next.quiet_hours.start,
            quiet_end = next.quiet_hours.end,
            "Suppression rules updated"
        );
        Ok(next)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn patch_publishes_new_snapshot_and_old_one_is_unchanged() {
        let engine = RuleEngine::default();
        let before = engine.current();

        let after = engine
            .patch(&RulePatch {
                max_per_hour: Some(1),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(before.max_per_hour, 10);
        assert_eq!(after.max_per_hour, 1);
        assert_eq!(engine.current().max_per_hour, 1);
    }

    #[test]
    fn rejected_patch_leaves_rules_unchanged() {
        let engine = RuleEngine::default();
        let res = engine.patch(&RulePatch {
            max_per_hour: Some(5),
            max_per_day: Some(0),
            ..Default::default()
        });
        assert_matches!(res, Err(CoreError::Validation(_)));
        assert_eq!(*engine.current(), RuleSet::default());
    }

    #[test]
    fn concurrent_patches_are_not_lost() {
        let engine = Arc::new(RuleEngine::default());
        let handles: Vec<_> = (1..=8u32)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "promotion" } else { "reminder" };
                    let patch = RulePatch {
                        cooldown_seconds: Some([(name.to_string(), u64::from(i))].into()),
                        max_per_day: if i == 8 { Some(99) } else { None },
                        ..Default::default()
                    };
                    engine.patch(&patch).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let rules = engine.current();
        assert_eq!(rules.max_per_day, 99);
        // Both cooldown keys were written by some patch.
        assert!(rules.cooldown_seconds.values().any(|v| *v % 2 == 0));
        assert!(rules.cooldown_seconds.values().any(|v| *v % 2 == 1));
    }
}
