//! # Environments
//!
//! The training loop talks to a simulation through the [`Environment`]
//! trait: reset to an initial observation, step with a discrete action,
//! optionally render, and sample a random action from the native action space.
//! [`TimeLimit`] wraps any environment with a per-episode step cap that the
//! caller can override before each episode.

mod cart_pole;

pub use cart_pole::CartPole;

use std::collections::HashMap;

use ndarray::Array1;

/// Outcome of one environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub observation: Array1<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: HashMap<String, f32>,
}

impl Step {
    pub fn new(observation: Array1<f32>, reward: f32, done: bool) -> Self {
        Step {
            observation,
            reward,
            done,
            info: HashMap::new(),
        }
    }
}

/// A sequential decision environment with a finite action set.
pub trait Environment {
    fn reset(&mut self) -> Array1<f32>;

    fn step(&mut self, action: usize) -> Step;

    fn render(&mut self) {}

    /// Draw an action uniformly from the action space.
    fn sample_action(&mut self) -> usize;

    fn n_actions(&self) -> usize;

    fn observation_size(&self) -> usize;

    /// Override the episode step limit, if the environment has one.
    fn set_max_episode_steps(&mut self, _steps: usize) {}
}

/// Ends episodes after a fixed number of steps.
///
/// Truncated steps report `done` and carry `info["truncated"] = 1.0`.
#[derive(Clone, Debug)]
pub struct TimeLimit<E> {
    inner: E,
    max_episode_steps: usize,
    elapsed: usize,
}

impl<E: Environment> TimeLimit<E> {
    pub fn new(inner: E, max_episode_steps: usize) -> Self {
        TimeLimit {
            inner,
            max_episode_steps,
            elapsed: 0,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    pub fn max_episode_steps(&self) -> usize {
        self.max_episode_steps
    }
}

impl<E: Environment> Environment for TimeLimit<E> {
    fn reset(&mut self) -> Array1<f32> {
        self.elapsed = 0;
        self.inner.reset()
    }

    fn step(&mut self, action: usize) -> Step {
        let mut step = self.inner.step(action);
        self.elapsed += 1;
        if self.elapsed >= self.max_episode_steps && !step.done {
            step.done = true;
            step.info.insert("truncated".to_string(), 1.0);
        }
        step
    }

    fn render(&mut self) {
        self.inner.render()
    }

    fn sample_action(&mut self) -> usize {
        self.inner.sample_action()
    }

    fn n_actions(&self) -> usize {
        self.inner.n_actions()
    }

    fn observation_size(&self) -> usize {
        self.inner.observation_size()
    }

    fn set_max_episode_steps(&mut self, steps: usize) {
        self.max_episode_steps = steps;
        self.inner.set_max_episode_steps(steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Counter {
        t: f32,
    }

    impl Environment for Counter {
        fn reset(&mut self) -> Array1<f32> {
            self.t = 0.0;
            array![self.t]
        }

        fn step(&mut self, _action: usize) -> Step {
            self.t += 1.0;
            Step::new(array![self.t], 1.0, false)
        }

        fn sample_action(&mut self) -> usize {
            0
        }

        fn n_actions(&self) -> usize {
            1
        }

        fn observation_size(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_time_limit_truncates() {
        let mut env = TimeLimit::new(Counter { t: 0.0 }, 3);
        env.reset();
        assert!(!env.step(0).done);
        assert!(!env.step(0).done);
        let last = env.step(0);
        assert!(last.done);
        assert_eq!(last.info.get("truncated"), Some(&1.0));
    }

    #[test]
    fn test_time_limit_override_and_reset() {
        let mut env = TimeLimit::new(Counter { t: 0.0 }, 10);
        env.set_max_episode_steps(1);
        env.reset();
        assert!(env.step(0).done);
        env.reset();
        assert!(env.step(0).done);
        assert_eq!(env.max_episode_steps(), 1);
    }
}
