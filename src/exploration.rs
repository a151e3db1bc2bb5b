//! # Epsilon-Greedy Exploration
//!
//! `EpsilonGreedy` decides, on every training-mode selection, whether to take
//! the model's greedy proposal or a random action. The exploration rate decays
//! after each training-mode selection and can optionally be perturbed upward on
//! a fixed period to re-inject exploration after premature convergence.
//!
//! ```rust
//! use deepq::config::ExplorationConfig;
//! use deepq::exploration::EpsilonGreedy;
//!
//! let config = ExplorationConfig {
//!     eps_initial: 1.0,
//!     decay: 0.01,
//!     decay_schedule: "compound".to_string(),
//!     perturb_increase_every: 100,
//!     perturb_increase_mag: 0.25,
//!     ..ExplorationConfig::default()
//! };
//! let eps = EpsilonGreedy::new(&config).unwrap();
//! let trace = eps.simulate(1_000, false);
//! assert_eq!(trace.len(), 1_001);
//! ```

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ExplorationConfig;
use crate::error::{DeepQError, Result};
use crate::visualization::plot_metrics;

/// Number of steps `simulate` is usually asked for when eyeballing a schedule.
pub const DEFAULT_SIMULATION_STEPS: usize = 10_000;

/// How epsilon shrinks after each training-mode selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecaySchedule {
    /// `eps -= decay`
    Linear,
    /// `eps *= 1 - decay`
    Compound,
}

impl DecaySchedule {
    fn apply(&self, eps: f32, decay: f32) -> f32 {
        match self {
            DecaySchedule::Linear => eps - decay,
            DecaySchedule::Compound => eps * (1.0 - decay),
        }
    }
}

impl FromStr for DecaySchedule {
    type Err = DeepQError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(DecaySchedule::Linear),
            "compound" => Ok(DecaySchedule::Compound),
            other => Err(DeepQError::invalid_parameter(
                "decay_schedule".to_string(),
                format!("unknown schedule '{}', expected 'linear' or 'compound'", other),
            )),
        }
    }
}

impl fmt::Display for DecaySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecaySchedule::Linear => write!(f, "linear"),
            DecaySchedule::Compound => write!(f, "compound"),
        }
    }
}

/// Upper bound applied after a perturbation jump.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum PerturbCeiling {
    /// No clamping; epsilon may exceed its initial value after a jump.
    #[default]
    Unbounded,
    /// Clamp to `eps_initial`.
    Initial,
    /// Clamp to a fixed value.
    Fixed(f32),
}

fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

/// Stateful epsilon-greedy selector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    eps_initial: f32,
    eps_min: f32,
    decay: f32,
    decay_schedule: DecaySchedule,
    perturb_increase_every: usize,
    perturb_increase_mag: f32,
    perturb_ceiling: PerturbCeiling,
    eps_current: f32,
    step_count: u64,
    #[serde(skip, default = "entropy_rng")]
    rng: StdRng,
}

impl EpsilonGreedy {
    /// Build a selector from config, rejecting bad parameters up front.
    pub fn new(config: &ExplorationConfig) -> Result<Self> {
        let decay_schedule: DecaySchedule = config.decay_schedule.parse()?;

        for (name, value) in [("eps_initial", config.eps_initial), ("eps_min", config.eps_min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DeepQError::invalid_parameter(
                    name.to_string(),
                    format!("must be within [0, 1], got {}", value),
                ));
            }
        }
        if config.decay < 0.0 || !config.decay.is_finite() {
            return Err(DeepQError::invalid_parameter(
                "decay".to_string(),
                format!("must be a non-negative number, got {}", config.decay),
            ));
        }
        if decay_schedule == DecaySchedule::Compound && config.decay >= 1.0 {
            return Err(DeepQError::invalid_parameter(
                "decay".to_string(),
                format!("compound decay must be below 1, got {}", config.decay),
            ));
        }
        if config.perturb_increase_mag < 0.0 {
            return Err(DeepQError::invalid_parameter(
                "perturb_increase_mag".to_string(),
                format!("must be non-negative, got {}", config.perturb_increase_mag),
            ));
        }
        if let PerturbCeiling::Fixed(ceiling) = config.perturb_ceiling {
            if ceiling < 0.0 {
                return Err(DeepQError::invalid_parameter(
                    "perturb_ceiling".to_string(),
                    format!("must be non-negative, got {}", ceiling),
                ));
            }
        }

        Ok(EpsilonGreedy {
            eps_initial: config.eps_initial,
            eps_min: config.eps_min,
            decay: config.decay,
            decay_schedule,
            perturb_increase_every: config.perturb_increase_every,
            perturb_increase_mag: config.perturb_increase_mag,
            perturb_ceiling: config.perturb_ceiling,
            eps_current: config.eps_initial,
            step_count: 0,
            rng: entropy_rng(),
        })
    }

    /// Reseed the exploration draw, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Choose between the greedy and the random option.
    ///
    /// Outside training the greedy option is always taken and no state changes.
    /// In training mode the random option is taken with probability
    /// `eps_current`, after which the schedule advances by one step.
    pub fn select<T, G, R>(&mut self, greedy_option: G, random_option: R, training: bool) -> T
    where
        G: FnOnce() -> T,
        R: FnOnce() -> T,
    {
        if !training {
            return greedy_option();
        }

        let explore = self.rng.gen::<f32>() < self.eps_current;
        let selection = if explore { random_option() } else { greedy_option() };
        self.advance();
        selection
    }

    /// Replay `steps` training-mode cycles on a private copy of the schedule,
    /// starting from `eps_initial`. The first element is the initial value.
    pub fn simulate(&self, steps: usize, plot: bool) -> Vec<f32> {
        let mut schedule = self.clone();
        schedule.eps_current = schedule.eps_initial;
        schedule.step_count = 0;

        let mut trace = Vec::with_capacity(steps + 1);
        trace.push(schedule.eps_current);
        for _ in 0..steps {
            schedule.advance();
            trace.push(schedule.eps_current);
        }

        if plot {
            tracing::info!("\n{}", plot_metrics(&trace, "Epsilon schedule", 72, 16));
        }

        trace
    }

    fn advance(&mut self) {
        self.step_count += 1;

        if self.decay > 0.0 {
            let floor = self.floor();
            self.eps_current = self.decay_schedule.apply(self.eps_current, self.decay).max(floor);
        }

        if self.perturbation_enabled() && self.step_count % self.perturb_increase_every as u64 == 0 {
            self.eps_current += self.perturb_increase_mag;
            self.eps_current = match self.perturb_ceiling {
                PerturbCeiling::Unbounded => self.eps_current,
                PerturbCeiling::Initial => self.eps_current.min(self.eps_initial),
                PerturbCeiling::Fixed(ceiling) => self.eps_current.min(ceiling),
            };
            tracing::debug!(step = self.step_count, eps = self.eps_current, "epsilon perturbed");
        }
    }

    // eps_min above eps_initial would make decay push epsilon upward
    fn floor(&self) -> f32 {
        self.eps_min.min(self.eps_initial)
    }

    fn perturbation_enabled(&self) -> bool {
        self.perturb_increase_every > 0 && self.perturb_increase_mag > 0.0
    }

    pub fn eps_current(&self) -> f32 {
        self.eps_current
    }

    pub fn eps_initial(&self) -> f32 {
        self.eps_initial
    }

    pub fn eps_min(&self) -> f32 {
        self.eps_min
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn decay_schedule(&self) -> DecaySchedule {
        self.decay_schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(decay: f32, schedule: &str) -> ExplorationConfig {
        ExplorationConfig {
            eps_initial: 0.5,
            eps_min: 0.1,
            decay,
            decay_schedule: schedule.to_string(),
            ..ExplorationConfig::default()
        }
    }

    #[test]
    fn test_unknown_schedule_fails_at_construction() {
        let result = EpsilonGreedy::new(&config(0.1, "exponential"));
        assert!(matches!(result, Err(DeepQError::InvalidParameter { .. })));
    }

    #[test]
    fn test_linear_decay_floors_at_min() {
        let eps = EpsilonGreedy::new(&config(0.15, "linear")).unwrap();
        let trace = eps.simulate(4, false);
        let expected = [0.5, 0.35, 0.2, 0.1, 0.1];
        for (got, want) in trace.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_compound_decay_multiplies() {
        let eps = EpsilonGreedy::new(&config(0.5, "compound")).unwrap();
        let trace = eps.simulate(2, false);
        assert!((trace[1] - 0.25).abs() < 1e-6);
        assert!((trace[2] - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_simulate_leaves_live_state_alone() {
        let mut eps = EpsilonGreedy::new(&config(0.1, "linear")).unwrap().with_seed(3);
        let _ = eps.select(|| 0, || 1, true);
        let before = eps.eps_current();
        let _ = eps.simulate(50, false);
        assert_eq!(eps.eps_current(), before);
        assert_eq!(eps.step_count(), 1);
    }

    #[test]
    fn test_perturb_ceiling_initial_clamps() {
        let cfg = ExplorationConfig {
            eps_initial: 0.5,
            eps_min: 0.0,
            decay: 0.0,
            perturb_increase_every: 2,
            perturb_increase_mag: 0.4,
            perturb_ceiling: PerturbCeiling::Initial,
            ..ExplorationConfig::default()
        };
        let trace = EpsilonGreedy::new(&cfg).unwrap().simulate(4, false);
        assert!(trace.iter().all(|&e| e <= 0.5 + 1e-6));
    }

    #[test]
    fn test_perturb_unbounded_can_exceed_initial() {
        let cfg = ExplorationConfig {
            eps_initial: 0.5,
            eps_min: 0.0,
            decay: 0.0,
            perturb_increase_every: 2,
            perturb_increase_mag: 0.4,
            ..ExplorationConfig::default()
        };
        let trace = EpsilonGreedy::new(&cfg).unwrap().simulate(2, false);
        assert!((trace[2] - 0.9).abs() < 1e-6);
    }
}
