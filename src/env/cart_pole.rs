use std::f32::consts::PI;

use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Environment, Step};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const HALF_POLE_LENGTH: f32 = 0.5;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * PI / 360.0;

/// Classic pole balancing: push the cart left (0) or right (1).
///
/// Reward is 1 for every step taken, including the one that ends the
/// episode. No step cap of its own; wrap it in [`super::TimeLimit`].
#[derive(Clone, Debug)]
pub struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    done: bool,
    rng: StdRng,
}

impl CartPole {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        CartPole {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            done: false,
            rng,
        }
    }

    fn observation(&self) -> Array1<f32> {
        array![self.x, self.x_dot, self.theta, self.theta_dot]
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Array1<f32> {
        self.x = self.rng.gen_range(-0.05..0.05);
        self.x_dot = self.rng.gen_range(-0.05..0.05);
        self.theta = self.rng.gen_range(-0.05..0.05);
        self.theta_dot = self.rng.gen_range(-0.05..0.05);
        self.done = false;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Step {
        if self.done {
            tracing::warn!("CartPole stepped after the episode ended; call reset first");
            return Step::new(self.observation(), 0.0, true);
        }

        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();
        let total_mass = MASS_CART + MASS_POLE;
        let pole_mass_length = MASS_POLE * HALF_POLE_LENGTH;

        let temp = (force + pole_mass_length * self.theta_dot * self.theta_dot * sin_theta) / total_mass;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (HALF_POLE_LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += TAU * self.x_dot;
        self.x_dot += TAU * x_acc;
        self.theta += TAU * self.theta_dot;
        self.theta_dot += TAU * theta_acc;

        self.done = self.x.abs() > X_THRESHOLD || self.theta.abs() > THETA_THRESHOLD;
        Step::new(self.observation(), 1.0, self.done)
    }

    fn render(&mut self) {
        tracing::debug!(x = self.x, theta = self.theta, "cart pole");
    }

    fn sample_action(&mut self) -> usize {
        self.rng.gen_range(0..2)
    }

    fn n_actions(&self) -> usize {
        2
    }

    fn observation_size(&self) -> usize {
        4
    }
}
