use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DeepQError, Result};

/// One recorded step of interaction.
///
/// The next state is stored explicitly at append time so every sampled
/// transition carries the observation that actually followed it, including
/// across the circular wrap of the buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

impl Transition {
    pub fn new(state: Array1<f32>, action: usize, reward: f32, next_state: Array1<f32>, done: bool) -> Self {
        Transition { state, action, reward, next_state, done }
    }
}

/// A batch drawn from the buffer, decomposed into parallel sequences.
#[derive(Clone, Debug)]
pub struct SampledBatch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub dones: Vec<bool>,
    pub next_states: Array2<f32>,
}

impl SampledBatch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Fixed-capacity circular store of transitions.
///
/// Once `capacity` transitions have been appended the buffer is `full` and
/// each further append overwrites the oldest slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    position: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: Vec::new(),
            capacity,
            position: 0,
        }
    }

    pub fn append(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Draws `batch_size` transitions uniformly at random, with replacement.
    pub fn sample_batch<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<SampledBatch> {
        if self.buffer.is_empty() {
            return Err(DeepQError::EmptyBuffer("cannot sample from an empty replay buffer".to_string()));
        }

        let state_size = self.buffer[0].state.len();
        let mut states = Array2::zeros((batch_size, state_size));
        let mut next_states = Array2::zeros((batch_size, state_size));
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Array1::zeros(batch_size);
        let mut dones = Vec::with_capacity(batch_size);

        for row in 0..batch_size {
            let transition = &self.buffer[rng.gen_range(0..self.buffer.len())];
            if transition.state.len() != state_size || transition.next_state.len() != state_size {
                return Err(DeepQError::dimension_mismatch(
                    format!("states of length {}", state_size),
                    format!("state of length {}", transition.state.len()),
                ));
            }
            states.row_mut(row).assign(&transition.state);
            next_states.row_mut(row).assign(&transition.next_state);
            actions.push(transition.action);
            rewards[row] = transition.reward;
            dones.push(transition.done);
        }

        Ok(SampledBatch { states, actions, rewards, dones, next_states })
    }

    /// True once capacity has been reached at least once.
    pub fn full(&self) -> bool {
        self.capacity > 0 && self.buffer.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot the next append writes to.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Iterates stored transitions from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        let split = if self.full() { self.position } else { 0 };
        let (newer, older) = self.buffer.split_at(split);
        older.iter().chain(newer.iter())
    }

    /// Rough size of the stored observations in bytes for a given state length.
    /// Saturates at `usize::MAX` instead of overflowing.
    pub fn estimated_bytes(capacity: usize, state_size: usize) -> usize {
        let per_transition = state_size
            .saturating_mul(2 * std::mem::size_of::<f32>())
            .saturating_add(std::mem::size_of::<Transition>());
        capacity.saturating_mul(per_transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transition(i: usize) -> Transition {
        Transition::new(array![i as f32], i % 3, i as f32, array![(i + 1) as f32], false)
    }

    #[test]
    fn test_write_position_wraps() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..4 {
            buffer.append(transition(i));
        }
        assert_eq!(buffer.position(), 1);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_iter_is_chronological_after_wrap() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..5 {
            buffer.append(transition(i));
        }
        let states: Vec<f32> = buffer.iter().map(|t| t.state[0]).collect();
        assert_eq!(states, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_huge_capacity_is_lazy() {
        let mut buffer = ReplayBuffer::new(1 << 60);
        buffer.append(transition(0));
        assert_eq!(buffer.len(), 1);
        assert!(!buffer.full());
        assert_eq!(ReplayBuffer::estimated_bytes(1 << 60, 4), usize::MAX);
        assert_eq!(ReplayBuffer::estimated_bytes(usize::MAX, usize::MAX), usize::MAX);
        assert!(ReplayBuffer::estimated_bytes(10, 4) >= 10 * 2 * 4 * 4);
    }

    #[test]
    fn test_sample_empty_is_error() {
        let buffer = ReplayBuffer::new(3);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(buffer.sample_batch(2, &mut rng).is_err());
    }
}
