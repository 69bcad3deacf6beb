//! Snapshot providers for the externally owned rule set and overrides.
//!
//! Evaluations read one `Arc` snapshot at their start and never see a
//! replacement that happens mid-evaluation. Replacing swaps the `Arc` under a
//! short write lock.

use std::sync::{Arc, PoisonError, RwLock};

use portal_core::DomainResult;

use crate::overrides::CatalogOverrides;
use crate::rules::RuleSet;

/// Source of rule-set snapshots.
pub trait RuleSetProvider: Send + Sync {
    fn snapshot(&self) -> Arc<RuleSet>;
}

/// Source of catalog-override snapshots.
pub trait OverrideStore: Send + Sync {
    fn snapshot(&self) -> Arc<CatalogOverrides>;
}

/// A fixed rule set (e.g. the shipped default).
#[derive(Debug, Clone)]
pub struct StaticRuleSet(Arc<RuleSet>);

impl StaticRuleSet {
    pub fn new(rule_set: RuleSet) -> Self {
        Self(Arc::new(rule_set))
    }
}

impl RuleSetProvider for StaticRuleSet {
    fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.0)
    }
}

/// Replaceable in-memory rule set.
#[derive(Debug, Default)]
pub struct InMemoryRuleSetStore {
    current: RwLock<Arc<RuleSet>>,
}

impl InMemoryRuleSetStore {
    pub fn new(rule_set: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rule_set)),
        }
    }

    /// Validate and install a new rule set. On error the old set stays.
    pub fn replace(&self, rule_set: RuleSet) -> DomainResult<()> {
        rule_set.validate()?;
        // The guarded value is a single Arc, so a poisoned lock still holds a
        // complete snapshot.
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(rule_set);
        tracing::info!(rules = current.rules.len(), "rule set replaced");
        Ok(())
    }
}

impl RuleSetProvider for InMemoryRuleSetStore {
    fn snapshot(&self) -> Arc<RuleSet> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }
}

/// Replaceable in-memory override store.
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    current: RwLock<Arc<CatalogOverrides>>,
}

impl InMemoryOverrideStore {
    pub fn new(overrides: CatalogOverrides) -> Self {
        Self {
            current: RwLock::new(Arc::new(overrides)),
        }
    }

    pub fn replace(&self, overrides: CatalogOverrides) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(overrides);
        tracing::info!(overrides = current.len(), "catalog overrides replaced");
    }
}

impl OverrideStore for InMemoryOverrideStore {
    fn snapshot(&self) -> Arc<CatalogOverrides> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }
}
