//! CartPole with a deep Q-learning agent
//!
//! Trains a dense network on the bundled cart-pole simulation, checkpoints
//! along the way, then reports greedy performance.
//!
//! Run with: RUST_LOG=info cargo run --release --example cart_pole

use deepq::agent::DeepQAgentBuilder;
use deepq::config::{AgentConfig, ComputeConfig, ExplorationConfig};
use deepq::env::{CartPole, TimeLimit};
use deepq::error::Result;
use deepq::models::DenseNetwork;
use deepq::optimizer::{Adam, OptimizerWrapper};
use deepq::training::{evaluate, train, TrainingOptions};

const MAX_STEPS: usize = 500;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let compute = ComputeConfig {
        threads: Some(4),
        memory_limit_mb: Some(256),
    }
    .apply()?;

    let config = AgentConfig {
        name: "DeepQAgent".to_string(),
        env_spec: "CartPole-v1".to_string(),
        gamma: 0.99,
        replay_buffer_samples: 64,
        replay_buffer_capacity: 10_000,
        double: true,
        exploration: ExplorationConfig {
            eps_initial: 1.0,
            eps_min: 0.01,
            decay: 0.0005,
            perturb_increase_every: 20_000,
            perturb_increase_mag: 0.1,
            ..ExplorationConfig::default()
        },
        seed: Some(42),
        ..AgentConfig::default()
    };

    let model = DenseNetwork::new(&[4, 128, 128, 2], OptimizerWrapper::Adam(Adam::default()), 0.0005)?;
    let mut agent = DeepQAgentBuilder::new(config)
        .model(model)
        .env(TimeLimit::new(CartPole::seeded(42), MAX_STEPS))
        .compute(compute)
        .build()?;

    let options = TrainingOptions {
        n_episodes: 400,
        max_episode_steps: MAX_STEPS,
        update_every: 20,
        checkpoint_every: 100,
        checkpoint_dir: "checkpoints".into(),
        ..TrainingOptions::default()
    };
    let history = train(&mut agent, &options)?;
    history.save("checkpoints/cart_pole_history.json")?;
    println!("{}", history.plot_rewards(72, 16));

    let rewards = evaluate(&mut agent, 10, MAX_STEPS)?;
    let mean = rewards.iter().sum::<f32>() / rewards.len() as f32;
    println!("Greedy evaluation over {} episodes: {:.1}", rewards.len(), mean);

    Ok(())
}
