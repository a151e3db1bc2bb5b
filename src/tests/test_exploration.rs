use crate::config::ExplorationConfig;
use crate::exploration::{DecaySchedule, EpsilonGreedy, PerturbCeiling};

fn selector(eps_initial: f32, decay: f32) -> EpsilonGreedy {
    let config = ExplorationConfig {
        eps_initial,
        decay,
        ..ExplorationConfig::default()
    };
    EpsilonGreedy::new(&config).unwrap().with_seed(0)
}

#[test]
fn test_full_exploration_draws_from_pool() {
    let mut eps = selector(1.0, 0.0);
    let pool = [0usize, 1, 2];
    let mut seen = [false; 3];
    let mut draw = 0usize;
    for _ in 0..200 {
        draw += 1;
        let choice = eps.select(|| 99, || pool[draw % pool.len()], true);
        assert!(pool.contains(&choice));
        seen[choice] = true;
    }
    assert!(seen.iter().all(|&s| s));
    assert_eq!(eps.step_count(), 200);
}

#[test]
fn test_evaluation_is_always_greedy() {
    let mut eps = selector(1.0, 0.1);
    for _ in 0..50 {
        assert_eq!(eps.select(|| 7, || 0, false), 7);
    }
    assert_eq!(eps.eps_current(), 1.0);
    assert_eq!(eps.step_count(), 0);
}

#[test]
fn test_zero_epsilon_is_always_greedy() {
    let mut eps = selector(0.0, 0.0);
    for _ in 0..50 {
        assert_eq!(eps.select(|| 3, || 4, true), 3);
    }
}

#[test]
fn test_random_option_not_called_when_greedy() {
    let mut eps = selector(0.0, 0.0);
    let mut random_calls = 0;
    eps.select(|| 1, || { random_calls += 1; 2 }, true);
    assert_eq!(random_calls, 0);
}

#[test]
fn test_training_selection_decays() {
    let mut eps = selector(0.99, 0.5);
    assert_eq!(eps.decay_schedule(), DecaySchedule::Compound);
    eps.select(|| 0, || 1, true);
    assert!((eps.eps_current() - 0.495).abs() < 1e-6);
}

#[test]
fn test_perturbation_produces_upward_step() {
    let config = ExplorationConfig {
        eps_initial: 1.0,
        decay: 0.01,
        perturb_increase_every: 100,
        perturb_increase_mag: 0.2,
        ..ExplorationConfig::default()
    };
    let trace = EpsilonGreedy::new(&config).unwrap().simulate(500, false);
    assert!(trace.windows(2).any(|pair| pair[1] > pair[0]));
}

#[test]
fn test_fixed_ceiling_caps_perturbation() {
    let config = |perturb_ceiling| ExplorationConfig {
        eps_initial: 0.5,
        decay: 0.0,
        perturb_increase_every: 2,
        perturb_increase_mag: 0.4,
        perturb_ceiling,
        ..ExplorationConfig::default()
    };

    let capped = EpsilonGreedy::new(&config(PerturbCeiling::Fixed(0.7))).unwrap().simulate(10, false);
    assert!(capped.iter().all(|&e| e <= 0.7 + 1e-6), "trace {:?}", capped);
    assert!((capped[2] - 0.7).abs() < 1e-6);
    assert!((capped[10] - 0.7).abs() < 1e-6);

    let unbounded = EpsilonGreedy::new(&config(PerturbCeiling::Unbounded)).unwrap().simulate(10, false);
    assert!(unbounded[2] > 0.7);

    assert!(EpsilonGreedy::new(&config(PerturbCeiling::Fixed(-0.1))).is_err());
}

#[test]
fn test_no_perturbation_when_disabled() {
    for (every, mag) in [(0, 0.5), (10, 0.0)] {
        let config = ExplorationConfig {
            eps_initial: 1.0,
            decay: 0.01,
            perturb_increase_every: every,
            perturb_increase_mag: mag,
            ..ExplorationConfig::default()
        };
        let trace = EpsilonGreedy::new(&config).unwrap().simulate(300, false);
        assert!(trace.windows(2).all(|pair| pair[1] <= pair[0]));
    }
}

#[test]
fn test_state_survives_json() {
    let mut eps = selector(0.8, 0.1);
    for _ in 0..5 {
        eps.select(|| 0, || 1, true);
    }
    let restored: EpsilonGreedy = serde_json::from_str(&serde_json::to_string(&eps).unwrap()).unwrap();
    assert_eq!(restored.eps_current(), eps.eps_current());
    assert_eq!(restored.step_count(), 5);
}
