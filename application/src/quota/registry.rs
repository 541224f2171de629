//! Registry of quota gates keyed by model identity.

use super::gate::{QuotaError, QuotaGate, QuotaPermit, QuotaSnapshot};
use forecast_domain::{Model, QuotaConfig};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Hands out one shared [`QuotaGate`] per model.
///
/// Quota resolution order: explicit override, the model's published
/// quota, then the registry default. Gates are created on first use, so
/// their windows start with the first call for that model.
///
/// Registries are plain values: a process normally builds one and shares
/// it through an `Arc`, while tests build their own isolated instance.
pub struct QuotaRegistry {
    default_quota: QuotaConfig,
    overrides: HashMap<Model, QuotaConfig>,
    gates: Mutex<HashMap<Model, QuotaGate>>,
}

impl QuotaRegistry {
    pub fn new() -> Self {
        Self::with_default_quota(QuotaConfig::default())
    }

    pub fn with_default_quota(default_quota: QuotaConfig) -> Self {
        Self {
            default_quota,
            overrides: HashMap::new(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Override the quota of one model
    pub fn with_quota(mut self, model: Model, quota: QuotaConfig) -> Self {
        self.overrides.insert(model, quota);
        self
    }

    /// Quota a gate for `model` is (or would be) created with
    pub fn quota_for(&self, model: &Model) -> QuotaConfig {
        self.overrides
            .get(model)
            .copied()
            .or_else(|| model.builtin_quota())
            .unwrap_or(self.default_quota)
    }

    /// Effective quota of every known model plus each overridden one, sorted
    pub fn quota_table(&self) -> Vec<(Model, QuotaConfig)> {
        let mut models = Model::known_models();
        models.extend(self.overrides.keys().cloned());
        models.sort();
        models.dedup();
        models
            .into_iter()
            .map(|model| {
                let quota = self.quota_for(&model);
                (model, quota)
            })
            .collect()
    }

    /// Gate for `model`, created on first request
    pub fn gate(&self, model: &Model) -> QuotaGate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates
            .entry(model.clone())
            .or_insert_with(|| {
                let quota = self.quota_for(model);
                debug!(
                    "Creating quota gate for {}: {} requests / {:?}, {} tokens / {:?}",
                    model,
                    quota.requests_per_period,
                    quota.request_period,
                    quota.tokens_per_period,
                    quota.token_period
                );
                QuotaGate::new(model.clone(), quota)
            })
            .clone()
    }

    /// Wait for admission of one call to `model`
    pub async fn acquire(
        &self,
        model: &Model,
        estimated_tokens: u64,
    ) -> Result<QuotaPermit, QuotaError> {
        self.gate(model).acquire(estimated_tokens).await
    }

    /// Counters of an existing gate
    pub fn snapshot(&self, model: &Model) -> Option<QuotaSnapshot> {
        let gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.get(model).map(QuotaGate::snapshot)
    }
}

impl Default for QuotaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_quota_table_includes_custom_overrides() {
        let custom = Model::Custom("local-llama".to_string());
        let quota = QuotaConfig::new(5, 500, Duration::from_secs(10), Duration::from_secs(2));
        let registry = QuotaRegistry::new().with_quota(custom.clone(), quota);

        let table = registry.quota_table();

        assert_eq!(table.len(), Model::known_models().len() + 1);
        assert!(table.contains(&(custom, quota)));
        assert!(table.contains(&(Model::Gpt4o, Model::Gpt4o.builtin_quota().unwrap())));
    }

    #[test]
    fn test_quota_resolution_order() {
        let custom = QuotaConfig::new(1, 100, Duration::from_secs(1), Duration::from_secs(1));
        let fallback = QuotaConfig::new(2, 200, Duration::from_secs(2), Duration::from_secs(2));
        let registry = QuotaRegistry::with_default_quota(fallback).with_quota(Model::Gpt4o, custom);

        assert_eq!(registry.quota_for(&Model::Gpt4o), custom);
        assert_eq!(
            registry.quota_for(&Model::O3Mini),
            Model::O3Mini.builtin_quota().unwrap()
        );
        assert_eq!(registry.quota_for(&Model::Custom("local".into())), fallback);
    }

    #[test]
    fn test_same_model_shares_gate() {
        let registry = QuotaRegistry::new();
        let a = registry.gate(&Model::Gpt4oMini);
        let b = registry.gate(&Model::Gpt4oMini);
        let c = registry.gate(&Model::Gpt4o);
        assert!(a.same_gate(&b));
        assert!(!a.same_gate(&c));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_counts_against_model_gate() {
        let registry = QuotaRegistry::new();
        assert!(registry.snapshot(&Model::O3Mini).is_none());

        registry
            .acquire(&Model::O3Mini, 500)
            .await
            .unwrap()
            .complete(Some(420));
        registry.acquire(&Model::O3Mini, 500).await.unwrap().complete(None);

        let snapshot = registry.snapshot(&Model::O3Mini).unwrap();
        assert_eq!(snapshot.requests_in_window, 2);
        assert_eq!(snapshot.tokens_consumed, 920);
        assert!(registry.snapshot(&Model::Gpt4o).is_none());
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = QuotaRegistry::new();
        let second = QuotaRegistry::new();
        assert!(!first.gate(&Model::O3Mini).same_gate(&second.gate(&Model::O3Mini)));
    }
}
