use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Element-wise nonlinearity applied after a dense transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    LeakyRelu { alpha: f32 },
    Tanh,
}

impl Activation {
    /// Apply the activation function to a batch in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
            Activation::LeakyRelu { alpha } => {
                let a = *alpha;
                inputs.mapv_inplace(|v| if v > 0.0 { v } else { a * v });
            }
            Activation::Tanh => inputs.mapv_inplace(f32::tanh),
        }
    }

    /// Derivative with respect to the pre-activation values.
    pub fn derivative_batch(&self, pre_activation: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(pre_activation.dim()),
            Activation::LeakyRelu { alpha } => {
                let a = *alpha;
                pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { a })
            }
            Activation::Tanh => pre_activation.mapv(|v| {
                let t = v.tanh();
                1.0 - t * t
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relu_and_derivative() {
        let mut x = array![[-1.0, 0.0, 2.0]];
        let pre = x.clone();
        Activation::Relu.apply_batch(&mut x);
        assert_eq!(x, array![[0.0, 0.0, 2.0]]);
        assert_eq!(Activation::Relu.derivative_batch(pre.view()), array![[0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_leaky_relu_keeps_negative_slope() {
        let mut x = array![[-2.0, 3.0]];
        Activation::LeakyRelu { alpha: 0.1 }.apply_batch(&mut x);
        assert!((x[[0, 0]] + 0.2).abs() < 1e-6);
        assert_eq!(x[[0, 1]], 3.0);
    }
}
