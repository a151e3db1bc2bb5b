use std::path::{Path, PathBuf};

use ndarray::ArrayView1;

use crate::env::Environment;
use crate::error::Result;
use crate::replay_buffer::Transition;

/// The calls a training controller needs from a value-based agent.
///
/// `play_episode` and `after_episode_update` are written purely against the
/// four core calls, so any implementor gets the same episode loop.
pub trait QAgent {
    type Env: Environment;

    fn env_mut(&mut self) -> &mut Self::Env;

    /// Record one transition.
    fn update_experience(&mut self, transition: Transition) -> Result<()>;

    /// One TD update; `Ok(None)` while there is not enough data to train.
    fn update_model(&mut self) -> Result<Option<f32>>;

    /// Epsilon-greedy action; exploration only happens when `training`.
    fn get_action(&mut self, state: ArrayView1<f32>, training: bool) -> Result<usize>;

    /// Hard copy of action-model weights into the value model.
    fn update_value_model(&mut self) -> Result<()>;

    /// Current exploration rate, if the agent explores.
    fn exploration_rate(&self) -> Option<f32> {
        None
    }

    /// Play one episode, returning the total reward and the final frame index.
    ///
    /// When `training`, every step appends its transition and then runs one
    /// model update. The value model is never touched here.
    fn play_episode(&mut self, max_episode_steps: usize, training: bool, render: bool) -> Result<(f32, usize)> {
        if max_episode_steps == 0 {
            tracing::warn!("episode requested with a step cap of 0; nothing to play");
            return Ok((0.0, 0));
        }

        self.env_mut().set_max_episode_steps(max_episode_steps);
        let mut observation = self.env_mut().reset();
        let mut total_reward = 0.0;
        let mut frame = 0;

        for f in 0..max_episode_steps {
            frame = f;
            let action = self.get_action(observation.view(), training)?;
            let step = self.env_mut().step(action);
            total_reward += step.reward;

            if render {
                self.env_mut().render();
            }

            let done = step.done;
            let previous = std::mem::replace(&mut observation, step.observation);
            if training {
                self.update_experience(Transition::new(previous, action, step.reward, observation.clone(), done))?;
                self.update_model()?;
            }

            if done {
                break;
            }
        }

        Ok((total_reward, frame))
    }

    /// End-of-episode hook: sync the value model.
    fn after_episode_update(&mut self) -> Result<()> {
        self.update_value_model()
    }
}

/// Agents that can persist themselves under a root directory.
pub trait Checkpoint {
    /// Write a checkpoint and return the directory it went to.
    fn save<P: AsRef<Path>>(&self, root: P) -> Result<PathBuf>;
}
