//! In-memory checkpoint storage for tests and dry runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::CheckpointState;
use crate::storage::CheckpointStore;

/// Keeps the checkpoint in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<CheckpointState>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state.
    pub fn with_state(state: CheckpointState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: Mutex::new(0),
        }
    }

    /// Copy of the last saved state.
    pub fn snapshot(&self) -> CheckpointState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&self) -> CheckpointState {
        self.snapshot()
    }

    async fn save(&self, state: &CheckpointState) -> Result<()> {
        let mut stored = self
            .state
            .lock()
            .map_err(|_| AppError::validation("checkpoint lock poisoned"))?;
        *stored = state.clone();
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
