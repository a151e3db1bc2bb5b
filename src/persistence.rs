//! # Persistence
//!
//! Checkpoints live in one directory per run, named `"{name}_{env_spec}"`:
//!
//! - `action_model.bin`, `value_model.bin`: bincode-encoded models
//! - `replay_buffer.bin`: bincode-encoded buffer, including write position
//! - `agent.json`: configuration and exploration state

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DeepQError, Result};

pub const ACTION_MODEL_FILE: &str = "action_model.bin";
pub const VALUE_MODEL_FILE: &str = "value_model.bin";
pub const REPLAY_BUFFER_FILE: &str = "replay_buffer.bin";
pub const AGENT_STATE_FILE: &str = "agent.json";

/// Paths of one run's checkpoint files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    pub fn new<P: AsRef<Path>>(root: P, run_name: &str) -> Self {
        RunDirectory {
            root: root.as_ref().join(run_name),
        }
    }

    /// Use an existing run directory as is.
    pub fn at<P: AsRef<Path>>(dir: P) -> Self {
        RunDirectory {
            root: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Fails with `NotReady` when a required checkpoint file is missing.
    pub fn require(&self, name: &str) -> Result<PathBuf> {
        let path = self.file(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DeepQError::NotReady(format!("missing checkpoint file {}", path.display())))
        }
    }
}

pub fn save_bincode<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let serialized = bincode::serialize(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

pub fn load_bincode<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let data = fs::read(path)?;
    Ok(bincode::deserialize(&data)?)
}

pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
