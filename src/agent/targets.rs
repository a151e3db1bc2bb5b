use ndarray::{Array2, ArrayView2};

use crate::error::{DeepQError, Result};
use crate::models::argmax;
use crate::replay_buffer::SampledBatch;

/// Temporal-difference target construction.
///
/// The target matrix starts as a copy of the current value estimates; for
/// each row only the column of the action actually taken is replaced, with
/// `reward` for terminal rows (or `final_reward` when set) and
/// `reward + gamma * Q(s', a*)` otherwise. `a*` is the argmax of the future
/// estimates themselves, or of `selection` when it is given (double DQN).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TdTargets {
    pub gamma: f32,
    pub final_reward: Option<f32>,
}

impl TdTargets {
    pub fn new(gamma: f32, final_reward: Option<f32>) -> Self {
        TdTargets { gamma, final_reward }
    }

    pub fn compute(
        &self,
        batch: &SampledBatch,
        values_now: ArrayView2<f32>,
        values_future: ArrayView2<f32>,
        selection: Option<ArrayView2<f32>>,
    ) -> Result<Array2<f32>> {
        let rows = batch.len();
        let n_actions = values_now.ncols();
        if values_now.nrows() != rows || values_future.dim() != values_now.dim() {
            return Err(DeepQError::dimension_mismatch(
                format!("value estimates of shape ({}, {})", rows, n_actions),
                format!("{:?} and {:?}", values_now.dim(), values_future.dim()),
            ));
        }
        if let Some(selection) = &selection {
            if selection.dim() != values_future.dim() {
                return Err(DeepQError::dimension_mismatch(
                    format!("selection estimates of shape {:?}", values_future.dim()),
                    format!("{:?}", selection.dim()),
                ));
            }
        }

        let mut targets = values_now.to_owned();
        for row in 0..rows {
            let action = batch.actions[row];
            if action >= n_actions {
                return Err(DeepQError::InvalidAction { action, max_actions: n_actions });
            }

            let reward = batch.rewards[row];
            let target = if batch.dones[row] {
                self.final_reward.unwrap_or(reward)
            } else {
                let future = values_future.row(row);
                let next_value = match &selection {
                    Some(selection) => future[argmax(selection.row(row))],
                    None => future.fold(f32::NEG_INFINITY, |max, &v| max.max(v)),
                };
                reward + self.gamma * next_value
            };
            targets[[row, action]] = target;
        }

        Ok(targets)
    }
}
