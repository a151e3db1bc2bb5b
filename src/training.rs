//! # Training Controller
//!
//! Cross-episode glue around [`QAgent::play_episode`]: one value-model sync
//! per finished episode, periodic progress logs and checkpoints, and a
//! [`TrainingHistory`] of per-episode results.
//!
//! ```rust,no_run
//! use deepq::agent::DeepQAgentBuilder;
//! use deepq::config::AgentConfig;
//! use deepq::env::{CartPole, TimeLimit};
//! use deepq::models::DenseNetwork;
//! use deepq::optimizer::{Adam, OptimizerWrapper};
//! use deepq::training::{train, TrainingOptions};
//!
//! let model = DenseNetwork::new(&[4, 64, 64, 2], OptimizerWrapper::Adam(Adam::default()), 0.001).unwrap();
//! let mut agent = DeepQAgentBuilder::new(AgentConfig::default())
//!     .model(model)
//!     .env(TimeLimit::new(CartPole::new(), 500))
//!     .build()
//!     .unwrap();
//!
//! let options = TrainingOptions { n_episodes: 300, ..TrainingOptions::default() };
//! let history = train(&mut agent, &options).unwrap();
//! println!("last 100 episodes: {:.1}", history.mean_reward(100));
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::{Checkpoint, QAgent};
use crate::error::Result;
use crate::persistence::{load_json, save_json};
use crate::visualization::{plot_metrics, training_progress};

/// How a training run is driven.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    pub n_episodes: usize,
    pub max_episode_steps: usize,
    pub render: bool,
    /// Log progress every this many episodes.
    pub update_every: usize,
    /// Checkpoint every this many episodes; 0 disables checkpoints.
    pub checkpoint_every: usize,
    pub checkpoint_dir: PathBuf,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            n_episodes: 500,
            max_episode_steps: 500,
            render: false,
            update_every: 10,
            checkpoint_every: 0,
            checkpoint_dir: PathBuf::from("checkpoints"),
        }
    }
}

/// Per-episode results of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub rewards: Vec<f32>,
    /// Final frame index of each episode.
    pub frames: Vec<usize>,
    /// Exploration rate after each episode, when the agent reports one.
    pub epsilons: Vec<f32>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, reward: f32, frames: usize, epsilon: Option<f32>) {
        self.rewards.push(reward);
        self.frames.push(frames);
        if let Some(eps) = epsilon {
            self.epsilons.push(eps);
        }
    }

    pub fn episodes(&self) -> usize {
        self.rewards.len()
    }

    /// Mean reward over the last `window` episodes (all of them if fewer).
    pub fn mean_reward(&self, window: usize) -> f32 {
        let start = self.rewards.len().saturating_sub(window.max(1));
        let recent = &self.rewards[start..];
        if recent.is_empty() {
            0.0
        } else {
            recent.iter().sum::<f32>() / recent.len() as f32
        }
    }

    /// Mean of each sliding window of `window` rewards.
    pub fn rolling_mean_rewards(&self, window: usize) -> Vec<f32> {
        let window = window.max(1);
        self.rewards
            .windows(window)
            .map(|w| w.iter().sum::<f32>() / window as f32)
            .collect()
    }

    pub fn best_reward(&self) -> Option<f32> {
        self.rewards.iter().copied().reduce(f32::max)
    }

    pub fn plot_rewards(&self, width: usize, height: usize) -> String {
        plot_metrics(&self.rewards, "Episode Rewards", width, height)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json(path, self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_json(path)
    }
}

/// Train for `options.n_episodes` episodes.
pub fn train<A>(agent: &mut A, options: &TrainingOptions) -> Result<TrainingHistory>
where
    A: QAgent + Checkpoint,
{
    let mut history = TrainingHistory::new();
    let update_every = options.update_every.max(1);

    tracing::info!(episodes = options.n_episodes, max_steps = options.max_episode_steps, "training started");

    for episode in 1..=options.n_episodes {
        let (reward, frames) = agent.play_episode(options.max_episode_steps, true, options.render)?;
        agent.after_episode_update()?;
        history.record(reward, frames, agent.exploration_rate());

        if episode % update_every == 0 {
            tracing::info!(
                "{}",
                training_progress(episode, options.n_episodes, history.mean_reward(update_every), agent.exploration_rate())
            );
        }

        if options.checkpoint_every > 0 && episode % options.checkpoint_every == 0 {
            let dir = agent.save(&options.checkpoint_dir)?;
            tracing::info!(episode, dir = %dir.display(), "checkpoint written");
        }
    }

    tracing::info!(
        episodes = history.episodes(),
        mean_reward = history.mean_reward(100),
        "training finished"
    );
    Ok(history)
}

/// Play greedy episodes without learning; returns the total reward of each.
pub fn evaluate<A: QAgent>(agent: &mut A, n_episodes: usize, max_episode_steps: usize) -> Result<Vec<f32>> {
    let mut rewards = Vec::with_capacity(n_episodes);
    for _ in 0..n_episodes {
        let (reward, _) = agent.play_episode(max_episode_steps, false, false)?;
        rewards.push(reward);
    }
    if !rewards.is_empty() {
        let mean = rewards.iter().sum::<f32>() / rewards.len() as f32;
        tracing::info!(episodes = n_episodes, mean_reward = mean, "evaluation finished");
    }
    Ok(rewards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(rewards: &[f32]) -> TrainingHistory {
        let mut h = TrainingHistory::new();
        for (i, &r) in rewards.iter().enumerate() {
            h.record(r, i, Some(0.5));
        }
        h
    }

    #[test]
    fn test_mean_reward_windows() {
        let h = history(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.mean_reward(2), 3.5);
        assert_eq!(h.mean_reward(100), 2.5);
        assert_eq!(TrainingHistory::new().mean_reward(10), 0.0);
    }

    #[test]
    fn test_rolling_mean() {
        let h = history(&[1.0, 3.0, 5.0]);
        assert_eq!(h.rolling_mean_rewards(2), vec![2.0, 4.0]);
        assert!(h.rolling_mean_rewards(5).is_empty());
        assert_eq!(h.best_reward(), Some(5.0));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let h = history(&[1.0, 2.0]);
        h.save(&path).unwrap();
        assert_eq!(TrainingHistory::load(&path).unwrap(), h);
    }
}
