use ndarray::{Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dense::{
    apply_gradients, backward_stack, build_stack, export_stack, forward_stack, import_stack, infer_stack, DenseLayer,
};
use super::{mean_squared_error, ModelWeights, QModel};
use crate::activations::Activation;
use crate::error::{DeepQError, Result};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// Dueling Q-network.
///
/// A shared ReLU trunk feeds a state-value head (one output) and an advantage
/// head (one output per action); values are `V + A - mean(A)`. Weights are
/// exported trunk first, then the value head, then the advantage head.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DuelingNetwork {
    pub trunk: Vec<DenseLayer>,
    pub value_head: Vec<DenseLayer>,
    pub advantage_head: Vec<DenseLayer>,
    pub optimizer: OptimizerWrapper,
    pub learning_rate: f32,
}

impl DuelingNetwork {
    /// `trunk_sizes` starts with the observation length; each head gets one
    /// hidden layer of `head_hidden` units.
    pub fn new(
        trunk_sizes: &[usize],
        head_hidden: usize,
        n_actions: usize,
        optimizer: OptimizerWrapper,
        learning_rate: f32,
    ) -> Result<Self> {
        Self::new_with_rng(trunk_sizes, head_hidden, n_actions, optimizer, learning_rate, &mut rand::thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        trunk_sizes: &[usize],
        head_hidden: usize,
        n_actions: usize,
        optimizer: OptimizerWrapper,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let trunk = build_stack(trunk_sizes, Activation::Relu, Activation::Relu, rng)?;
        let features = trunk_sizes[trunk_sizes.len() - 1];
        if n_actions == 0 {
            return Err(DeepQError::invalid_parameter("n_actions", "must be greater than 0"));
        }
        let value_head = build_stack(&[features, head_hidden, 1], Activation::Relu, Activation::Linear, rng)?;
        let advantage_head = build_stack(&[features, head_hidden, n_actions], Activation::Relu, Activation::Linear, rng)?;

        Ok(DuelingNetwork {
            trunk,
            value_head,
            advantage_head,
            optimizer,
            learning_rate,
        })
    }

    fn combine(values: &Array2<f32>, advantages: &Array2<f32>) -> Array2<f32> {
        let mean_advantage = advantages.mean_axis(Axis(1)).unwrap_or_else(|| ndarray::Array1::zeros(advantages.nrows()));
        advantages - &mean_advantage.insert_axis(Axis(1)) + values
    }
}

impl QModel for DuelingNetwork {
    fn input_size(&self) -> usize {
        self.trunk.first().map_or(0, DenseLayer::input_size)
    }

    fn n_actions(&self) -> usize {
        self.advantage_head.last().map_or(0, DenseLayer::output_size)
    }

    fn predict(&self, states: ArrayView2<f32>) -> Array2<f32> {
        let features = infer_stack(&self.trunk, states);
        let values = infer_stack(&self.value_head, features.view());
        let advantages = infer_stack(&self.advantage_head, features.view());
        Self::combine(&values, &advantages)
    }

    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let (features, trunk_caches) = forward_stack(&self.trunk, states);
        let (values, value_caches) = forward_stack(&self.value_head, features.view());
        let (advantages, advantage_caches) = forward_stack(&self.advantage_head, features.view());
        let outputs = Self::combine(&values, &advantages);
        let loss = mean_squared_error(&outputs, targets);

        let batch_size = states.nrows().max(1) as f32;
        let q_errors = (&outputs - &targets) / batch_size;

        // dQ_j/dV = 1, dQ_j/dA_k = [j == k] - 1/n
        let value_errors = q_errors.sum_axis(Axis(1)).insert_axis(Axis(1));
        let mean_error = q_errors.mean_axis(Axis(1)).unwrap_or_else(|| ndarray::Array1::zeros(q_errors.nrows()));
        let advantage_errors = &q_errors - &mean_error.insert_axis(Axis(1));

        let (value_grads, value_input_errors) = backward_stack(&self.value_head, &value_caches, value_errors);
        let (advantage_grads, advantage_input_errors) =
            backward_stack(&self.advantage_head, &advantage_caches, advantage_errors);
        let feature_errors = value_input_errors + &advantage_input_errors;
        let (trunk_grads, _) = backward_stack(&self.trunk, &trunk_caches, feature_errors);

        let trunk_len = self.trunk.len();
        let value_len = self.value_head.len();
        self.optimizer.begin_step();
        apply_gradients(&mut self.trunk, trunk_grads, 0, &mut self.optimizer, self.learning_rate);
        apply_gradients(&mut self.value_head, value_grads, trunk_len, &mut self.optimizer, self.learning_rate);
        apply_gradients(
            &mut self.advantage_head,
            advantage_grads,
            trunk_len + value_len,
            &mut self.optimizer,
            self.learning_rate,
        );
        loss
    }

    fn get_weights(&self) -> ModelWeights {
        ModelWeights {
            layers: export_stack(&self.trunk)
                .chain(export_stack(&self.value_head))
                .chain(export_stack(&self.advantage_head))
                .collect(),
        }
    }

    fn set_weights(&mut self, weights: &ModelWeights) -> Result<()> {
        self.get_weights().check_compatible(weights)?;
        let trunk_len = self.trunk.len();
        let value_len = self.value_head.len();
        import_stack(&mut self.trunk, weights.layers[..trunk_len].iter());
        import_stack(&mut self.value_head, weights.layers[trunk_len..trunk_len + value_len].iter());
        import_stack(&mut self.advantage_head, weights.layers[trunk_len + value_len..].iter());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::SGD;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network(seed: u64) -> DuelingNetwork {
        let mut rng = StdRng::seed_from_u64(seed);
        DuelingNetwork::new_with_rng(&[3, 16], 8, 2, OptimizerWrapper::SGD(SGD::new()), 0.05, &mut rng).unwrap()
    }

    #[test]
    fn test_combine_centres_advantages() {
        let values = array![[2.0]];
        let advantages = array![[1.0, 3.0]];
        assert_eq!(DuelingNetwork::combine(&values, &advantages), array![[1.0, 3.0]]);
    }

    #[test]
    fn test_shapes_and_weight_layout() {
        let net = network(0);
        assert_eq!(net.input_size(), 3);
        assert_eq!(net.n_actions(), 2);
        assert_eq!(net.get_weights().layers.len(), 5);
        assert_eq!(net.predict(array![[0.0, 1.0, 0.0]].view()).dim(), (1, 2));
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = network(1);
        let states = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let targets = array![[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]];
        let first = net.train_on_batch(states.view(), targets.view());
        let mut last = first;
        for _ in 0..500 {
            last = net.train_on_batch(states.view(), targets.view());
        }
        assert!(last < first * 0.5, "loss went from {} to {}", first, last);
    }

    #[test]
    fn test_set_weights_copies_all_streams() {
        let source = network(2);
        let mut dest = network(3);
        dest.set_weights(&source.get_weights()).unwrap();
        let input = array![[0.2, -0.4, 0.9]];
        assert_eq!(source.predict(input.view()), dest.predict(input.view()));
    }
}
