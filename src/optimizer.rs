use std::collections::HashMap;

use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

/// Gradient-descent update rule.
///
/// Parameters are addressed by a stable `param_id` (the owning model numbers
/// its layers) so stateful optimizers can keep per-parameter moments.
pub trait Optimizer {
    /// Called once per training step, before any parameter is updated.
    fn begin_step(&mut self) {}

    fn update_weights(&mut self, param_id: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);

    fn update_biases(&mut self, param_id: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn begin_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.begin_step(),
        }
    }

    fn update_weights(&mut self, param_id: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(param_id, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(param_id, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, param_id: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(param_id, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(param_id, biases, gradients, learning_rate),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _param_id: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        Zip::from(weights)
            .and(gradients)
            .par_for_each(|w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _param_id: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Moments<A> {
    m: A,
    v: A,
}

/// Adam with bias-corrected first and second moments.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    weight_moments: HashMap<usize, Moments<Array2<f32>>>,
    bias_moments: HashMap<usize, Moments<Array1<f32>>>,
    pub t: i32,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            weight_moments: HashMap::new(),
            bias_moments: HashMap::new(),
            t: 0,
        }
    }

    fn corrections(&self) -> (f32, f32) {
        let t = self.t.max(1);
        (1.0 - self.beta1.powi(t), 1.0 - self.beta2.powi(t))
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update_weights(&mut self, param_id: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let moments = self.weight_moments.entry(param_id).or_insert_with(|| Moments {
            m: Array2::zeros(weights.dim()),
            v: Array2::zeros(weights.dim()),
        });

        Zip::from(weights)
            .and(&mut moments.m)
            .and(&mut moments.v)
            .and(gradients)
            .par_for_each(|w, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *w -= learning_rate * (*m / c1) / ((*v / c2).sqrt() + eps);
            });
    }

    fn update_biases(&mut self, param_id: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let moments = self.bias_moments.entry(param_id).or_insert_with(|| Moments {
            m: Array1::zeros(biases.dim()),
            v: Array1::zeros(biases.dim()),
        });

        Zip::from(biases)
            .and(&mut moments.m)
            .and(&mut moments.v)
            .and(gradients)
            .for_each(|b, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *b -= learning_rate * (*m / c1) / ((*v / c2).sqrt() + eps);
            });
    }
}
