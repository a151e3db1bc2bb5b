use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{AgentConfig, ExplorationConfig};
use crate::env::{Environment, Step};
use crate::error::Result;
use crate::models::{LayerWeights, ModelWeights, QModel};

/// Linear lookup model: `Q(s) = s . table`. Training only records targets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableModel {
    pub table: Array2<f32>,
    pub last_targets: Option<Array2<f32>>,
    pub last_states: Option<Array2<f32>>,
    pub train_calls: usize,
}

impl TableModel {
    pub fn new(table: Array2<f32>) -> Self {
        TableModel {
            table,
            last_targets: None,
            last_states: None,
            train_calls: 0,
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::new(Array2::eye(n))
    }
}

impl QModel for TableModel {
    fn input_size(&self) -> usize {
        self.table.nrows()
    }

    fn n_actions(&self) -> usize {
        self.table.ncols()
    }

    fn predict(&self, states: ArrayView2<f32>) -> Array2<f32> {
        states.dot(&self.table)
    }

    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let loss = (self.predict(states) - &targets).mapv(|x| x * x).mean().unwrap_or(0.0);
        self.last_states = Some(states.to_owned());
        self.last_targets = Some(targets.to_owned());
        self.train_calls += 1;
        loss
    }

    fn get_weights(&self) -> ModelWeights {
        ModelWeights {
            layers: vec![LayerWeights {
                weights: self.table.clone(),
                biases: Array1::zeros(self.table.ncols()),
            }],
        }
    }

    fn set_weights(&mut self, weights: &ModelWeights) -> Result<()> {
        self.get_weights().check_compatible(weights)?;
        self.table.assign(&weights.layers[0].weights);
        Ok(())
    }
}

/// Cycles through `n` one-hot states; reward 1 when the action equals the
/// state index. Episodes end after `episode_len` steps.
pub struct OneHotEnv {
    pub n: usize,
    pub episode_len: usize,
    pub current: usize,
    pub steps: usize,
    pub resets: usize,
    rng: StdRng,
}

impl OneHotEnv {
    pub fn new(n: usize, episode_len: usize) -> Self {
        OneHotEnv {
            n,
            episode_len,
            current: 0,
            steps: 0,
            resets: 0,
            rng: StdRng::seed_from_u64(7),
        }
    }

    pub fn observation(&self) -> Array1<f32> {
        one_hot(self.n, self.current)
    }
}

impl Environment for OneHotEnv {
    fn reset(&mut self) -> Array1<f32> {
        self.current = 0;
        self.steps = 0;
        self.resets += 1;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Step {
        let reward = if action == self.current { 1.0 } else { 0.0 };
        self.current = (self.current + 1) % self.n;
        self.steps += 1;
        Step::new(self.observation(), reward, self.steps >= self.episode_len)
    }

    fn sample_action(&mut self) -> usize {
        self.rng.gen_range(0..self.n)
    }

    fn n_actions(&self) -> usize {
        self.n
    }

    fn observation_size(&self) -> usize {
        self.n
    }
}

pub fn one_hot(n: usize, i: usize) -> Array1<f32> {
    let mut v = Array1::zeros(n);
    v[i] = 1.0;
    v
}

/// Seeded config without exploration.
pub fn greedy_config(capacity: usize, samples: usize) -> AgentConfig {
    AgentConfig {
        name: "test".to_string(),
        env_spec: "OneHot".to_string(),
        replay_buffer_capacity: capacity,
        replay_buffer_samples: samples,
        exploration: ExplorationConfig {
            eps_initial: 0.0,
            eps_min: 0.0,
            ..ExplorationConfig::default()
        },
        seed: Some(42),
        ..AgentConfig::default()
    }
}
