//! # Deep Q-Learning Agents
//!
//! [`DeepQAgent`] pairs an action model (trained every step) with a value
//! model (synced once per episode) and learns from uniformly sampled replay
//! batches. The episode loop lives on the [`QAgent`] trait so it can be reused
//! by any agent that exposes the same four calls.
//!
//! ## Components
//!
//! - **Action model**: picks actions and receives every gradient step
//! - **Value model**: supplies TD estimates; a hard copy of the action model
//!   taken at the end of each episode
//! - **Replay buffer**: fixed-capacity ring of transitions; training starts
//!   once it is full
//! - **Epsilon-greedy**: decaying exploration with optional perturbation
//!
//! Setting `double` in [`AgentConfig`](crate::config::AgentConfig) switches
//! the target from `max_a Q_value(s', a)` to `Q_value(s', argmax_a Q_action(s', a))`.

mod dqn;
mod targets;
pub mod traits;

pub use dqn::{Components, DeepQAgent, DeepQAgentBuilder, Readiness};
pub use targets::TdTargets;
pub use traits::{Checkpoint, QAgent};
