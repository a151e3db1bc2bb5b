#[cfg(test)]
mod property_tests {
    use deepq::config::ExplorationConfig;
    use deepq::exploration::{EpsilonGreedy, PerturbCeiling};
    use deepq::replay_buffer::{ReplayBuffer, Transition};
    use ndarray::array;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn schedule_strategy() -> impl Strategy<Value = String> {
        prop_oneof![Just("linear".to_string()), Just("compound".to_string())]
    }

    fn transition(i: usize) -> Transition {
        Transition::new(array![i as f32, 0.0], i % 2, i as f32, array![i as f32 + 1.0, 1.0], i % 5 == 0)
    }

    proptest! {
        #[test]
        fn test_schedule_is_monotone_without_perturbation(
            eps_initial in 0.0f32..=1.0,
            eps_min in 0.0f32..=1.0,
            decay in 0.0f32..0.2,
            schedule in schedule_strategy(),
            steps in 1usize..400,
        ) {
            let config = ExplorationConfig {
                eps_initial,
                eps_min,
                decay,
                decay_schedule: schedule,
                ..ExplorationConfig::default()
            };
            let trace = EpsilonGreedy::new(&config).unwrap().simulate(steps, false);
            let floor = eps_min.min(eps_initial);

            prop_assert_eq!(trace.len(), steps + 1);
            prop_assert_eq!(trace[0], eps_initial);
            for pair in trace.windows(2) {
                prop_assert!(pair[1] <= pair[0]);
                prop_assert!(pair[1] >= floor);
            }
        }

        #[test]
        fn test_perturbation_only_rises_on_period(
            eps_initial in 0.1f32..=1.0,
            decay in 0.001f32..0.1,
            every in 1usize..50,
            mag in 0.01f32..0.5,
            steps in 1usize..300,
        ) {
            let config = ExplorationConfig {
                eps_initial,
                eps_min: 0.01,
                decay,
                decay_schedule: "compound".to_string(),
                perturb_increase_every: every,
                perturb_increase_mag: mag,
                perturb_ceiling: PerturbCeiling::Initial,
            };
            let trace = EpsilonGreedy::new(&config).unwrap().simulate(steps, false);

            for (step, pair) in trace.windows(2).enumerate().map(|(i, p)| (i + 1, p)) {
                let delta = pair[1] - pair[0];
                if step % every == 0 {
                    prop_assert!(delta <= mag + 1e-5);
                } else {
                    prop_assert!(delta <= 0.0);
                }
                prop_assert!(pair[1] <= eps_initial);
            }
        }

        #[test]
        fn test_buffer_keeps_most_recent(capacity in 1usize..40, appends in 0usize..120) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..appends {
                buffer.append(transition(i));
            }

            prop_assert_eq!(buffer.len(), appends.min(capacity));
            prop_assert_eq!(buffer.position(), appends % capacity);
            prop_assert_eq!(buffer.full(), appends >= capacity);

            let expected: Vec<usize> = (appends.saturating_sub(capacity)..appends).collect();
            let stored: Vec<usize> = buffer.iter().map(|t| t.reward as usize).collect();
            prop_assert_eq!(stored, expected);
        }

        #[test]
        fn test_samples_come_from_buffer(
            capacity in 1usize..20,
            appends in 1usize..60,
            batch in 1usize..32,
            seed in any::<u64>(),
        ) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..appends {
                buffer.append(transition(i));
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let sampled = buffer.sample_batch(batch, &mut rng).unwrap();

            prop_assert_eq!(sampled.len(), batch);
            let oldest = appends.saturating_sub(capacity) as f32;
            for row in 0..batch {
                let i = sampled.rewards[row];
                prop_assert!(i >= oldest && i < appends as f32);
                prop_assert_eq!(sampled.states[[row, 0]], i);
                prop_assert_eq!(sampled.next_states[[row, 0]], i + 1.0);
                prop_assert_eq!(sampled.actions[row], i as usize % 2);
                prop_assert_eq!(sampled.dones[row], i as usize % 5 == 0);
            }
        }
    }
}
