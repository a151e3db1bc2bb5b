// Test modules for cross-component behaviour
pub mod fixtures;
pub mod test_exploration;
