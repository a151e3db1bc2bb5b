//! # deepq - Deep Q-Learning Training Core
//!
//! deepq trains value-based agents on discrete-action environments. It keeps
//! two copies of a value model (an action model that learns every step and a
//! value model that is synced once per episode), replays uniformly sampled
//! experience from a fixed-capacity buffer, and explores with a decaying,
//! optionally perturbed epsilon-greedy schedule.
//!
//! ## Key Features
//!
//! - **Standard and double DQN targets** from a single configuration flag
//! - **Pluggable models** through the [`models::QModel`] capability trait
//! - **Pluggable environments** through [`env::Environment`], with a step-capping
//!   [`env::TimeLimit`] wrapper and a bundled cart-pole simulation
//! - **Checkpointing** of models, buffer and exploration state, plus an explicit
//!   unload/reload lifecycle for long-lived agents
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deepq::agent::{DeepQAgentBuilder, QAgent};
//! use deepq::config::{AgentConfig, ComputeConfig};
//! use deepq::env::{CartPole, TimeLimit};
//! use deepq::models::DenseNetwork;
//! use deepq::optimizer::{Adam, OptimizerWrapper};
//!
//! let compute = ComputeConfig { threads: Some(4), ..ComputeConfig::default() }.apply().unwrap();
//! let model = DenseNetwork::new(&[4, 64, 2], OptimizerWrapper::Adam(Adam::default()), 0.001).unwrap();
//!
//! let mut agent = DeepQAgentBuilder::new(AgentConfig { double: true, ..AgentConfig::default() })
//!     .model(model)
//!     .env(TimeLimit::new(CartPole::new(), 500))
//!     .compute(compute)
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..100 {
//!     agent.play_episode(500, true, false).unwrap();
//!     agent.after_episode_update().unwrap();
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions for the bundled networks
//! - [`agent`] - The deep Q-learning agent and the episode loop
//! - [`config`] - Agent hyperparameters and process-wide compute settings
//! - [`env`] - Environment capability, step limits and cart-pole
//! - [`error`] - Error types and result handling
//! - [`exploration`] - Epsilon-greedy schedule
//! - [`models`] - Model capability plus dense and dueling networks
//! - [`optimizer`] - SGD and Adam
//! - [`persistence`] - Checkpoint layout and file helpers
//! - [`replay_buffer`] - Experience replay
//! - [`training`] - Multi-episode training and evaluation
//! - [`visualization`] - Text plots for logs

pub mod activations;
pub mod agent;
pub mod config;
pub mod env;
pub mod error;
pub mod exploration;
pub mod models;
pub mod optimizer;
pub mod persistence;
pub mod replay_buffer;
pub mod training;
pub mod visualization;

#[cfg(test)]
mod tests;
