//! Checkpoint persistence.
//!
//! The checkpoint is the only durable state: one watermark per account.
//!
//! ```text
//! state.json
//! {
//!   "users": { "jack": { "last_id": 20 } },
//!   "updated_at": "2026-01-01T00:00:00Z"
//! }
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CheckpointState;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the last saved state.
    ///
    /// A missing or unreadable checkpoint is an empty state, never an error.
    async fn load(&self) -> CheckpointState;

    /// Replace the saved state. Either the whole new state is stored or
    /// the previous one is left intact.
    async fn save(&self, state: &CheckpointState) -> Result<()>;
}
