//! # Configuration
//!
//! Plain serde structs describing an agent run, loadable from JSON, plus the
//! process-wide compute configuration that must be applied before any model
//! is built.

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{DeepQError, Result};
use crate::exploration::PerturbCeiling;

/// Exploration schedule parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub eps_initial: f32,
    pub eps_min: f32,
    pub decay: f32,
    /// `"linear"` or `"compound"`; anything else is rejected when the
    /// selector is constructed.
    pub decay_schedule: String,
    pub perturb_increase_every: usize,
    pub perturb_increase_mag: f32,
    pub perturb_ceiling: PerturbCeiling,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        ExplorationConfig {
            eps_initial: 0.99,
            eps_min: 0.01,
            decay: 0.0005,
            decay_schedule: "compound".to_string(),
            perturb_increase_every: 0,
            perturb_increase_mag: 0.0,
            perturb_ceiling: PerturbCeiling::Unbounded,
        }
    }
}

/// Hyperparameters of a deep Q-learning agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Label of the environment the agent is trained on; part of the run name.
    pub env_spec: String,
    pub gamma: f32,
    /// Batch size drawn from the replay buffer per update.
    pub replay_buffer_samples: usize,
    /// Buffer capacity; training starts once it is full.
    pub replay_buffer_capacity: usize,
    /// Fixed target used for terminal transitions instead of the observed reward.
    pub final_reward: Option<f32>,
    /// Select next actions with the action model, evaluate with the value model.
    pub double: bool,
    pub exploration: ExplorationConfig,
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            name: "DeepQAgent".to_string(),
            env_spec: "CartPole".to_string(),
            gamma: 0.99,
            replay_buffer_samples: 75,
            replay_buffer_capacity: 10_000,
            final_reward: None,
            double: false,
            exploration: ExplorationConfig::default(),
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Name used for checkpoint directories.
    pub fn run_name(&self) -> String {
        format!("{}_{}", self.name, self.env_spec)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DeepQError::invalid_parameter(
                "gamma".to_string(),
                format!("must be within [0, 1], got {}", self.gamma),
            ));
        }
        if self.replay_buffer_capacity == 0 {
            return Err(DeepQError::invalid_parameter("replay_buffer_capacity", "must be greater than 0"));
        }
        if self.replay_buffer_samples == 0 {
            return Err(DeepQError::invalid_parameter("replay_buffer_samples", "must be greater than 0"));
        }
        if let Some(reward) = self.final_reward {
            if !reward.is_finite() {
                return Err(DeepQError::invalid_parameter("final_reward", "must be finite"));
            }
        }
        Ok(())
    }
}

/// Process-wide compute settings, applied once at start-up.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Worker threads for ndarray's parallel kernels; `None` keeps rayon's default.
    pub threads: Option<usize>,
    /// Cap on memory reserved for replay storage.
    pub memory_limit_mb: Option<usize>,
}

/// Proof that a `ComputeConfig` has been applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputeContext {
    memory_limit_bytes: Option<usize>,
    threads: usize,
}

static APPLIED: OnceLock<ComputeContext> = OnceLock::new();

fn megabytes(mb: usize) -> usize {
    mb.saturating_mul(1024 * 1024)
}

impl ComputeConfig {
    /// Configure the global thread pool. Later calls return the context of the
    /// first one.
    pub fn apply(self) -> Result<ComputeContext> {
        if self.threads == Some(0) {
            return Err(DeepQError::invalid_parameter("threads", "must be greater than 0"));
        }

        if let Some(context) = APPLIED.get() {
            if self.differs_from(context) {
                tracing::warn!(
                    requested_threads = ?self.threads,
                    active_threads = context.threads,
                    requested_memory_limit_mb = ?self.memory_limit_mb,
                    active_memory_limit_bytes = ?context.memory_limit_bytes,
                    "compute configuration already applied; keeping the first one"
                );
            }
            return Ok(context.clone());
        }

        if let Some(threads) = self.threads {
            // Fails when some other code already started the global pool
            if let Err(err) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
                tracing::warn!(%err, "could not size the global thread pool");
            }
        }

        let context = ComputeContext {
            memory_limit_bytes: self.memory_limit_mb.map(megabytes),
            threads: rayon::current_num_threads(),
        };
        tracing::info!(threads = context.threads, memory_limit_mb = ?self.memory_limit_mb, "compute configured");
        Ok(APPLIED.get_or_init(|| context).clone())
    }

    /// True when this request asks for something the active context does not provide.
    fn differs_from(&self, context: &ComputeContext) -> bool {
        let threads_differ = self.threads.is_some_and(|threads| threads != context.threads);
        threads_differ || self.memory_limit_mb.map(megabytes) != context.memory_limit_bytes
    }
}

impl ComputeContext {
    /// A context without a memory cap, for callers that skip `apply`.
    pub fn unlimited() -> Self {
        ComputeContext {
            memory_limit_bytes: None,
            threads: rayon::current_num_threads(),
        }
    }

    /// A context with a memory cap on the current pool, for callers that skip `apply`.
    pub fn limited(memory_limit_mb: usize) -> Self {
        ComputeContext {
            memory_limit_bytes: Some(megabytes(memory_limit_mb)),
            threads: rayon::current_num_threads(),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn memory_limit_bytes(&self) -> Option<usize> {
        self.memory_limit_bytes
    }

    /// Reject an allocation request above the configured cap.
    pub fn reserve(&self, what: &str, bytes: usize) -> Result<()> {
        match self.memory_limit_bytes {
            Some(limit) if bytes > limit => Err(DeepQError::invalid_parameter(
                what.to_string(),
                format!("needs ~{} bytes, above the {} byte memory limit", bytes, limit),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_gamma_rejected() {
        let config = AgentConfig { gamma: 1.5, ..AgentConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AgentConfig = serde_json::from_str(r#"{"name": "pong", "double": true}"#).unwrap();
        assert_eq!(config.name, "pong");
        assert!(config.double);
        assert_eq!(config.replay_buffer_samples, 75);
        assert_eq!(config.exploration.decay_schedule, "compound");
    }

    #[test]
    fn test_reserve_respects_limit() {
        let context = ComputeContext { memory_limit_bytes: Some(1024), threads: 1 };
        assert!(context.reserve("replay_buffer", 512).is_ok());
        assert!(context.reserve("replay_buffer", 4096).is_err());
        assert!(ComputeContext::unlimited().reserve("replay_buffer", usize::MAX).is_ok());
    }

    #[test]
    fn test_reapply_mismatch_detection() {
        let active = ComputeContext { memory_limit_bytes: Some(megabytes(64)), threads: 4 };
        let same = ComputeConfig { threads: Some(4), memory_limit_mb: Some(64) };
        let any_threads = ComputeConfig { threads: None, memory_limit_mb: Some(64) };
        let other_limit = ComputeConfig { threads: Some(4), memory_limit_mb: Some(128) };
        let no_limit = ComputeConfig { threads: None, memory_limit_mb: None };
        let other_threads = ComputeConfig { threads: Some(2), memory_limit_mb: Some(64) };
        assert!(!same.differs_from(&active));
        assert!(!any_threads.differs_from(&active));
        assert!(other_limit.differs_from(&active));
        assert!(no_limit.differs_from(&active));
        assert!(other_threads.differs_from(&active));
    }

    #[test]
    fn test_limited_context_saturates() {
        assert_eq!(ComputeContext::limited(2).memory_limit_bytes(), Some(2 * 1024 * 1024));
        assert_eq!(ComputeContext::limited(usize::MAX).memory_limit_bytes(), Some(usize::MAX));
        assert!(ComputeContext::limited(1).reserve("replay_buffer", usize::MAX).is_err());
    }
}
