use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{mean_squared_error, LayerWeights, ModelWeights, QModel};
use crate::activations::Activation;
use crate::error::{DeepQError, Result};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// A fully connected layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

/// Values a training forward pass keeps for the backward pass.
pub(crate) struct LayerCache {
    inputs: Array2<f32>,
    pre_activation: Array2<f32>,
}

pub(crate) struct LayerGradients {
    weights: Array2<f32>,
    biases: Array1<f32>,
}

impl DenseLayer {
    /// Xavier-uniform weights, zero biases.
    pub fn new_with_rng<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (input_size + output_size) as f32).sqrt();
        let weights = Array2::random_using((input_size, output_size), Uniform::new(-limit, limit), rng);
        DenseLayer {
            weights,
            biases: Array1::zeros(output_size),
            activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    fn pre_activation(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0))
    }

    pub fn infer(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = self.pre_activation(inputs);
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    fn forward_train(&self, inputs: ArrayView2<f32>) -> (Array2<f32>, LayerCache) {
        let pre_activation = self.pre_activation(inputs);
        let mut outputs = pre_activation.clone();
        self.activation.apply_batch(&mut outputs);
        let cache = LayerCache {
            inputs: inputs.to_owned(),
            pre_activation,
        };
        (outputs, cache)
    }

    /// Returns the parameter gradients and the error with respect to the inputs.
    fn backward(&self, cache: &LayerCache, output_errors: ArrayView2<f32>) -> (LayerGradients, Array2<f32>) {
        let adjusted = &output_errors * &self.activation.derivative_batch(cache.pre_activation.view());
        let gradients = LayerGradients {
            weights: cache.inputs.t().dot(&adjusted),
            biases: adjusted.sum_axis(Axis(0)),
        };
        let input_errors = adjusted.dot(&self.weights.t());
        (gradients, input_errors)
    }

    fn export(&self) -> LayerWeights {
        LayerWeights {
            weights: self.weights.clone(),
            biases: self.biases.clone(),
        }
    }

    fn import(&mut self, weights: &LayerWeights) {
        self.weights.assign(&weights.weights);
        self.biases.assign(&weights.biases);
    }
}

/// Build a stack of layers: `activation` on hidden layers, `output` on the last.
pub(crate) fn build_stack<R: Rng + ?Sized>(
    layer_sizes: &[usize],
    activation: Activation,
    output: Activation,
    rng: &mut R,
) -> Result<Vec<DenseLayer>> {
    if layer_sizes.len() < 2 {
        return Err(DeepQError::invalid_parameter("layer_sizes", "must have at least input and output sizes"));
    }
    if layer_sizes.iter().any(|&size| size == 0) {
        return Err(DeepQError::invalid_parameter("layer_sizes", "every layer needs at least one unit"));
    }

    let last = layer_sizes.len() - 2;
    Ok(layer_sizes
        .windows(2)
        .enumerate()
        .map(|(i, window)| {
            let act = if i == last { output } else { activation };
            DenseLayer::new_with_rng(window[0], window[1], act, rng)
        })
        .collect())
}

pub(crate) fn infer_stack(layers: &[DenseLayer], inputs: ArrayView2<f32>) -> Array2<f32> {
    let mut current = inputs.to_owned();
    for layer in layers {
        current = layer.infer(current.view());
    }
    current
}

pub(crate) fn forward_stack(layers: &[DenseLayer], inputs: ArrayView2<f32>) -> (Array2<f32>, Vec<LayerCache>) {
    let mut caches = Vec::with_capacity(layers.len());
    let mut current = inputs.to_owned();
    for layer in layers {
        let (output, cache) = layer.forward_train(current.view());
        caches.push(cache);
        current = output;
    }
    (current, caches)
}

/// Backpropagate through a stack; gradients come back in layer order.
pub(crate) fn backward_stack(
    layers: &[DenseLayer],
    caches: &[LayerCache],
    output_errors: Array2<f32>,
) -> (Vec<LayerGradients>, Array2<f32>) {
    let mut gradients = Vec::with_capacity(layers.len());
    let mut current = output_errors;
    for (layer, cache) in layers.iter().zip(caches).rev() {
        let (grads, input_errors) = layer.backward(cache, current.view());
        gradients.push(grads);
        current = input_errors;
    }
    gradients.reverse();
    (gradients, current)
}

/// Apply gradients; `first_id` numbers the stack's layers for the optimizer.
pub(crate) fn apply_gradients(
    layers: &mut [DenseLayer],
    gradients: Vec<LayerGradients>,
    first_id: usize,
    optimizer: &mut OptimizerWrapper,
    learning_rate: f32,
) {
    for (offset, (layer, grads)) in layers.iter_mut().zip(gradients).enumerate() {
        let id = first_id + offset;
        optimizer.update_weights(id, &mut layer.weights, &grads.weights, learning_rate);
        optimizer.update_biases(id, &mut layer.biases, &grads.biases, learning_rate);
    }
}

pub(crate) fn export_stack(layers: &[DenseLayer]) -> impl Iterator<Item = LayerWeights> + '_ {
    layers.iter().map(DenseLayer::export)
}

pub(crate) fn import_stack<'a>(layers: &mut [DenseLayer], weights: impl Iterator<Item = &'a LayerWeights>) {
    for (layer, w) in layers.iter_mut().zip(weights) {
        layer.import(w);
    }
}

/// A fully connected Q-network: ReLU hidden layers, linear output.
///
/// ```rust
/// use deepq::models::{DenseNetwork, QModel};
/// use deepq::optimizer::{OptimizerWrapper, SGD};
/// use ndarray::array;
///
/// let net = DenseNetwork::new(&[4, 32, 2], OptimizerWrapper::SGD(SGD::new()), 0.01).unwrap();
/// let values = net.predict(array![[0.1, 0.2, 0.3, 0.4]].view());
/// assert_eq!(values.dim(), (1, 2));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseNetwork {
    pub layers: Vec<DenseLayer>,
    pub optimizer: OptimizerWrapper,
    pub learning_rate: f32,
}

impl DenseNetwork {
    pub fn new(layer_sizes: &[usize], optimizer: OptimizerWrapper, learning_rate: f32) -> Result<Self> {
        Self::new_with_rng(layer_sizes, optimizer, learning_rate, &mut rand::thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        optimizer: OptimizerWrapper,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let layers = build_stack(layer_sizes, Activation::Relu, Activation::Linear, rng)?;
        Ok(DenseNetwork { layers, optimizer, learning_rate })
    }

    /// Replace the hidden-layer activation.
    pub fn with_hidden_activation(mut self, activation: Activation) -> Self {
        let last = self.layers.len().saturating_sub(1);
        for layer in &mut self.layers[..last] {
            layer.activation = activation;
        }
        self
    }
}

impl QModel for DenseNetwork {
    fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    fn n_actions(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    fn predict(&self, states: ArrayView2<f32>) -> Array2<f32> {
        infer_stack(&self.layers, states)
    }

    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let (outputs, caches) = forward_stack(&self.layers, states);
        let loss = mean_squared_error(&outputs, targets);
        let batch_size = states.nrows().max(1) as f32;
        let output_errors = (&outputs - &targets) / batch_size;

        let (gradients, _) = backward_stack(&self.layers, &caches, output_errors);
        self.optimizer.begin_step();
        apply_gradients(&mut self.layers, gradients, 0, &mut self.optimizer, self.learning_rate);
        loss
    }

    fn get_weights(&self) -> ModelWeights {
        ModelWeights {
            layers: export_stack(&self.layers).collect(),
        }
    }

    fn set_weights(&mut self, weights: &ModelWeights) -> Result<()> {
        self.get_weights().check_compatible(weights)?;
        import_stack(&mut self.layers, weights.layers.iter());
        Ok(())
    }
}
