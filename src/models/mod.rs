//! # Value Models
//!
//! The training core consumes value estimators through the [`QModel`]
//! capability: batch prediction of per-action values, one supervised training
//! step against a target matrix, and weight export/import for hard syncs.
//! Architectures plug in by implementing the trait; the update engine never
//! inspects which one it holds.
//!
//! ## Bundled Models
//!
//! - [`DenseNetwork`]: fully connected MLP, ReLU hidden layers, linear output
//! - [`DuelingNetwork`]: shared trunk feeding separate state-value and
//!   advantage heads, combined as `Q = V + A - mean(A)`

mod dense;
mod dueling;

pub use dense::{DenseLayer, DenseNetwork};
pub use dueling::DuelingNetwork;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{DeepQError, Result};

/// Parameters of one dense layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// Full parameter set of a model, in the model's own layer order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub layers: Vec<LayerWeights>,
}

impl ModelWeights {
    /// Check that `other` could be loaded into a model with these weights.
    pub fn check_compatible(&self, other: &ModelWeights) -> Result<()> {
        if self.layers.len() != other.layers.len() {
            return Err(DeepQError::dimension_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", other.layers.len()),
            ));
        }
        for (i, (mine, theirs)) in self.layers.iter().zip(&other.layers).enumerate() {
            if mine.weights.dim() != theirs.weights.dim() || mine.biases.dim() != theirs.biases.dim() {
                return Err(DeepQError::dimension_mismatch(
                    format!("layer {} of shape {:?}", i, mine.weights.dim()),
                    format!("layer {} of shape {:?}", i, theirs.weights.dim()),
                ));
            }
        }
        Ok(())
    }
}

/// A value estimator usable as action or target model.
pub trait QModel: Clone {
    /// Length of a flat observation.
    fn input_size(&self) -> usize;

    /// Number of discrete actions, i.e. columns of `predict`.
    fn n_actions(&self) -> usize;

    /// Value estimates, one row per state, one column per action.
    fn predict(&self, states: ArrayView2<f32>) -> Array2<f32>;

    /// One gradient step towards `targets`; returns the mean squared error
    /// before the step.
    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32;

    fn get_weights(&self) -> ModelWeights;

    fn set_weights(&mut self, weights: &ModelWeights) -> Result<()>;

    fn predict_one(&self, state: ArrayView1<f32>) -> Array1<f32> {
        self.predict(state.insert_axis(Axis(0))).index_axis_move(Axis(0), 0)
    }
}

/// Index of the largest value; the first one wins ties, NaN never wins.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

pub(crate) fn mean_squared_error(predictions: &Array2<f32>, targets: ArrayView2<f32>) -> f32 {
    (predictions - &targets).mapv(|x| x * x).mean().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(array![1.0, 3.0, 3.0].view()), 1);
        assert_eq!(argmax(array![f32::NAN, -1.0].view()), 1);
    }
}
