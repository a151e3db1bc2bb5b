use std::path::{Path, PathBuf};

use ndarray::{concatenate, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::targets::TdTargets;
use super::traits::{Checkpoint, QAgent};
use crate::config::{AgentConfig, ComputeContext};
use crate::env::Environment;
use crate::error::{DeepQError, Result};
use crate::exploration::EpsilonGreedy;
use crate::models::{argmax, QModel};
use crate::persistence::{
    load_bincode, load_json, save_bincode, save_json, RunDirectory, ACTION_MODEL_FILE, AGENT_STATE_FILE,
    REPLAY_BUFFER_FILE, VALUE_MODEL_FILE,
};
use crate::replay_buffer::{ReplayBuffer, Transition};

/// The heavy parts of an agent: both models and the replay buffer.
#[derive(Clone, Debug)]
pub struct Components<M> {
    pub action_model: M,
    pub value_model: M,
    pub replay_buffer: ReplayBuffer,
}

/// Whether the heavy parts are in memory or parked on disk.
#[derive(Clone, Debug)]
pub enum Readiness<M> {
    Ready(Box<Components<M>>),
    Unready { checkpoint: PathBuf },
}

/// What `agent.json` holds.
#[derive(Serialize, Deserialize)]
struct AgentSnapshot {
    config: AgentConfig,
    exploration: EpsilonGreedy,
    training_steps: u64,
}

/// Deep Q-learning agent with a separate, slower value model.
///
/// The action model picks actions and is trained on every update. The value
/// model supplies the estimates used for TD targets and only changes when
/// [`update_value_model`](Self::update_value_model) copies the action model's
/// weights into it, which the episode loop does once per finished episode.
///
/// # Example
///
/// ```rust
/// use deepq::agent::{DeepQAgentBuilder, QAgent};
/// use deepq::config::AgentConfig;
/// use deepq::env::{CartPole, TimeLimit};
/// use deepq::models::DenseNetwork;
/// use deepq::optimizer::{OptimizerWrapper, SGD};
///
/// let model = DenseNetwork::new(&[4, 16, 2], OptimizerWrapper::SGD(SGD::new()), 0.01).unwrap();
/// let config = AgentConfig { replay_buffer_capacity: 64, replay_buffer_samples: 8, ..AgentConfig::default() };
/// let mut agent = DeepQAgentBuilder::new(config)
///     .model(model)
///     .env(TimeLimit::new(CartPole::seeded(0), 200))
///     .build()
///     .unwrap();
///
/// let (reward, frames) = agent.play_episode(50, true, false).unwrap();
/// agent.after_episode_update().unwrap();
/// assert!(reward >= 1.0 && frames < 50);
/// ```
pub struct DeepQAgent<M, E> {
    config: AgentConfig,
    eps: EpsilonGreedy,
    env: E,
    readiness: Readiness<M>,
    rng: StdRng,
    training_steps: u64,
}

fn ready<M>(readiness: &Readiness<M>) -> Result<&Components<M>> {
    match readiness {
        Readiness::Ready(components) => Ok(components),
        Readiness::Unready { checkpoint } => Err(DeepQError::NotReady(format!(
            "models and buffer are unloaded to {}",
            checkpoint.display()
        ))),
    }
}

fn ready_mut<M>(readiness: &mut Readiness<M>) -> Result<&mut Components<M>> {
    match readiness {
        Readiness::Ready(components) => Ok(components),
        Readiness::Unready { checkpoint } => Err(DeepQError::NotReady(format!(
            "models and buffer are unloaded to {}",
            checkpoint.display()
        ))),
    }
}

fn check_state<M: QModel>(model: &M, state: ArrayView1<f32>, what: &str) -> Result<()> {
    if state.len() != model.input_size() {
        return Err(DeepQError::dimension_mismatch(
            format!("{} of length {}", what, model.input_size()),
            format!("{} of length {}", what, state.len()),
        ));
    }
    Ok(())
}

impl<M: QModel, E: Environment> DeepQAgent<M, E> {
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn exploration(&self) -> &EpsilonGreedy {
        &self.eps
    }

    pub fn epsilon(&self) -> f32 {
        self.eps.eps_current()
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Number of TD updates issued so far.
    pub fn training_steps(&self) -> u64 {
        self.training_steps
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }

    pub fn readiness(&self) -> &Readiness<M> {
        &self.readiness
    }

    pub fn action_model(&self) -> Result<&M> {
        Ok(&ready(&self.readiness)?.action_model)
    }

    pub fn value_model(&self) -> Result<&M> {
        Ok(&ready(&self.readiness)?.value_model)
    }

    pub fn replay_buffer(&self) -> Result<&ReplayBuffer> {
        Ok(&ready(&self.readiness)?.replay_buffer)
    }

    /// Validate and append one transition to the replay buffer.
    pub fn update_experience(&mut self, transition: Transition) -> Result<()> {
        let components = ready_mut(&mut self.readiness)?;
        let model = &components.action_model;
        check_state(model, transition.state.view(), "state")?;
        check_state(model, transition.next_state.view(), "next_state")?;
        if transition.action >= model.n_actions() {
            return Err(DeepQError::InvalidAction {
                action: transition.action,
                max_actions: model.n_actions(),
            });
        }
        components.replay_buffer.append(transition);
        Ok(())
    }

    /// Sample a batch, build TD targets from the value model and train the
    /// action model once. Skipped with `Ok(None)` until the buffer is full.
    pub fn update_model(&mut self) -> Result<Option<f32>> {
        let components = ready_mut(&mut self.readiness)?;
        if !components.replay_buffer.full() {
            return Ok(None);
        }

        let n = self.config.replay_buffer_samples;
        let batch = components.replay_buffer.sample_batch(n, &mut self.rng)?;

        // One value-model call covers both s and s'
        let stacked = concatenate(Axis(0), &[batch.states.view(), batch.next_states.view()])
            .map_err(|err| DeepQError::dimension_mismatch("stackable state batches".to_string(), err.to_string()))?;
        let estimates = components.value_model.predict(stacked.view());
        let (values_now, values_future) = estimates.view().split_at(Axis(0), n);

        let selection = if self.config.double {
            Some(components.action_model.predict(batch.next_states.view()))
        } else {
            None
        };

        let targets = TdTargets::new(self.config.gamma, self.config.final_reward).compute(
            &batch,
            values_now,
            values_future,
            selection.as_ref().map(|s| s.view()),
        )?;
        let loss = components.action_model.train_on_batch(batch.states.view(), targets.view());

        self.training_steps += 1;
        tracing::debug!(step = self.training_steps, loss, "action model updated");
        Ok(Some(loss))
    }

    /// Greedy action from the action model.
    pub fn get_best_action(&self, state: ArrayView1<f32>) -> Result<usize> {
        let model = &ready(&self.readiness)?.action_model;
        check_state(model, state, "state")?;
        Ok(argmax(model.predict_one(state).view()))
    }

    /// Epsilon-greedy selection; the random option is the environment's sampler.
    pub fn get_action(&mut self, state: ArrayView1<f32>, training: bool) -> Result<usize> {
        let model = &ready(&self.readiness)?.action_model;
        check_state(model, state, "state")?;
        let env = &mut self.env;
        let action = self.eps.select(
            || argmax(model.predict_one(state).view()),
            || env.sample_action(),
            training,
        );
        Ok(action)
    }

    /// Copy the action model's weights into the value model.
    pub fn update_value_model(&mut self) -> Result<()> {
        let components = ready_mut(&mut self.readiness)?;
        let weights = components.action_model.get_weights();
        components.value_model.set_weights(&weights)?;
        tracing::debug!(step = self.training_steps, "value model synced");
        Ok(())
    }
}

impl<M, E> DeepQAgent<M, E>
where
    M: QModel + Serialize + DeserializeOwned,
    E: Environment,
{
    fn run_directory<P: AsRef<Path>>(&self, root: P) -> RunDirectory {
        RunDirectory::new(root, &self.config.run_name())
    }

    fn write_snapshot(&self, run: &RunDirectory) -> Result<()> {
        let snapshot = AgentSnapshot {
            config: self.config.clone(),
            exploration: self.eps.clone(),
            training_steps: self.training_steps,
        };
        save_json(run.file(AGENT_STATE_FILE), &snapshot)
    }

    fn write_components(run: &RunDirectory, components: &Components<M>) -> Result<()> {
        save_bincode(run.file(ACTION_MODEL_FILE), &components.action_model)?;
        save_bincode(run.file(VALUE_MODEL_FILE), &components.value_model)?;
        save_bincode(run.file(REPLAY_BUFFER_FILE), &components.replay_buffer)
    }

    fn read_components(run: &RunDirectory) -> Result<Components<M>> {
        Ok(Components {
            action_model: load_bincode(run.require(ACTION_MODEL_FILE)?)?,
            value_model: load_bincode(run.require(VALUE_MODEL_FILE)?)?,
            replay_buffer: load_bincode(run.require(REPLAY_BUFFER_FILE)?)?,
        })
    }

    /// Save everything under `root/{name}_{env_spec}` and return that directory.
    pub fn save<P: AsRef<Path>>(&self, root: P) -> Result<PathBuf> {
        let run = self.run_directory(root);
        run.create()?;
        Self::write_components(&run, ready(&self.readiness)?)?;
        self.write_snapshot(&run)?;
        tracing::info!(dir = %run.path().display(), "agent saved");
        Ok(run.path().to_path_buf())
    }

    /// Rebuild an agent from a run directory written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(dir: P, env: E) -> Result<Self> {
        let run = RunDirectory::at(dir);
        let snapshot: AgentSnapshot = load_json(run.require(AGENT_STATE_FILE)?)?;
        let components = Self::read_components(&run)?;
        let (eps, rng) = seeded(snapshot.exploration, snapshot.config.seed, snapshot.training_steps);
        tracing::info!(dir = %run.path().display(), "agent loaded");
        Ok(DeepQAgent {
            config: snapshot.config,
            eps,
            env,
            readiness: Readiness::Ready(Box::new(components)),
            rng,
            training_steps: snapshot.training_steps,
        })
    }

    /// Persist models and buffer under `root`, then drop them from memory.
    pub fn unready<P: AsRef<Path>>(&mut self, root: P) -> Result<()> {
        if let Readiness::Ready(_) = self.readiness {
            let checkpoint = self.save(root)?;
            self.readiness = Readiness::Unready { checkpoint };
        }
        Ok(())
    }

    /// Reload models and buffer if they were unloaded.
    pub fn check_ready(&mut self) -> Result<()> {
        if let Readiness::Unready { checkpoint } = &self.readiness {
            let run = RunDirectory::at(checkpoint);
            let components = Self::read_components(&run)?;
            self.readiness = Readiness::Ready(Box::new(components));
        }
        Ok(())
    }
}

const STREAM_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed the exploration draw and the sampler from `seed`, offset by progress so
/// a reloaded agent continues with fresh draws instead of replaying step 0.
fn seeded(eps: EpsilonGreedy, seed: Option<u64>, training_steps: u64) -> (EpsilonGreedy, StdRng) {
    match seed {
        Some(seed) => {
            let eps_seed = seed.wrapping_add(eps.step_count().wrapping_mul(STREAM_STRIDE));
            let sampler_seed = seed.wrapping_add(1).wrapping_add(training_steps.wrapping_mul(STREAM_STRIDE));
            (eps.with_seed(eps_seed), StdRng::seed_from_u64(sampler_seed))
        }
        None => (eps, StdRng::from_entropy()),
    }
}

impl<M: QModel, E: Environment> QAgent for DeepQAgent<M, E> {
    type Env = E;

    fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn update_experience(&mut self, transition: Transition) -> Result<()> {
        DeepQAgent::update_experience(self, transition)
    }

    fn update_model(&mut self) -> Result<Option<f32>> {
        DeepQAgent::update_model(self)
    }

    fn get_action(&mut self, state: ArrayView1<f32>, training: bool) -> Result<usize> {
        DeepQAgent::get_action(self, state, training)
    }

    fn update_value_model(&mut self) -> Result<()> {
        DeepQAgent::update_value_model(self)
    }

    fn exploration_rate(&self) -> Option<f32> {
        Some(self.eps.eps_current())
    }
}

impl<M, E> Checkpoint for DeepQAgent<M, E>
where
    M: QModel + Serialize + DeserializeOwned,
    E: Environment,
{
    fn save<P: AsRef<Path>>(&self, root: P) -> Result<PathBuf> {
        DeepQAgent::save(self, root)
    }
}

/// Builder pattern for DeepQAgent
pub struct DeepQAgentBuilder<M, E> {
    config: AgentConfig,
    model: Option<M>,
    value_model: Option<M>,
    env: Option<E>,
    compute: Option<ComputeContext>,
}

impl<M: QModel, E: Environment> DeepQAgentBuilder<M, E> {
    pub fn new(config: AgentConfig) -> Self {
        DeepQAgentBuilder {
            config,
            model: None,
            value_model: None,
            env: None,
            compute: None,
        }
    }

    /// Action model; the value model starts as a copy unless set separately.
    pub fn model(mut self, model: M) -> Self {
        self.model = Some(model);
        self
    }

    pub fn value_model(mut self, model: M) -> Self {
        self.value_model = Some(model);
        self
    }

    pub fn env(mut self, env: E) -> Self {
        self.env = Some(env);
        self
    }

    /// Memory limits to respect when allocating the replay buffer.
    pub fn compute(mut self, context: ComputeContext) -> Self {
        self.compute = Some(context);
        self
    }

    pub fn build(self) -> Result<DeepQAgent<M, E>> {
        self.config.validate()?;

        let action_model = self
            .model
            .ok_or_else(|| DeepQError::invalid_parameter("model", "Model must be specified"))?;
        let env = self
            .env
            .ok_or_else(|| DeepQError::invalid_parameter("env", "Environment must be specified"))?;

        if action_model.input_size() != env.observation_size() {
            return Err(DeepQError::dimension_mismatch(
                format!("model input of size {}", env.observation_size()),
                format!("model input of size {}", action_model.input_size()),
            ));
        }
        if action_model.n_actions() != env.n_actions() {
            return Err(DeepQError::dimension_mismatch(
                format!("{} model outputs", env.n_actions()),
                format!("{} model outputs", action_model.n_actions()),
            ));
        }

        let value_model = match self.value_model {
            Some(value_model) => {
                action_model.get_weights().check_compatible(&value_model.get_weights())?;
                value_model
            }
            None => action_model.clone(),
        };

        let compute = self.compute.unwrap_or_else(ComputeContext::unlimited);
        compute.reserve(
            "replay_buffer_capacity",
            ReplayBuffer::estimated_bytes(self.config.replay_buffer_capacity, action_model.input_size()),
        )?;

        let eps = EpsilonGreedy::new(&self.config.exploration)?;
        let (eps, rng) = seeded(eps, self.config.seed, 0);
        let replay_buffer = ReplayBuffer::new(self.config.replay_buffer_capacity);

        tracing::info!(
            run = %self.config.run_name(),
            double = self.config.double,
            capacity = self.config.replay_buffer_capacity,
            "agent built"
        );

        Ok(DeepQAgent {
            config: self.config,
            eps,
            env,
            readiness: Readiness::Ready(Box::new(Components {
                action_model,
                value_model,
                replay_buffer,
            })),
            rng,
            training_steps: 0,
        })
    }
}
