//! Compare exploration schedules without training anything.
//!
//! Run with: RUST_LOG=info cargo run --example epsilon_schedule

use deepq::config::ExplorationConfig;
use deepq::error::Result;
use deepq::exploration::{EpsilonGreedy, PerturbCeiling, DEFAULT_SIMULATION_STEPS};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let schedules = [
        ("linear", 0.0001, 0, 0.0),
        ("compound", 0.0005, 0, 0.0),
        ("compound", 0.001, 2_500, 0.3),
    ];

    for (schedule, decay, every, mag) in schedules {
        let config = ExplorationConfig {
            eps_initial: 1.0,
            eps_min: 0.05,
            decay,
            decay_schedule: schedule.to_string(),
            perturb_increase_every: every,
            perturb_increase_mag: mag,
            perturb_ceiling: PerturbCeiling::Initial,
        };
        let trace = EpsilonGreedy::new(&config)?.simulate(DEFAULT_SIMULATION_STEPS, true);
        let last = trace.last().copied().unwrap_or(config.eps_initial);
        println!("{:<8} decay={:<7} perturb={}x{:.1}: final eps {:.4}", schedule, decay, every, mag, last);
    }

    Ok(())
}
