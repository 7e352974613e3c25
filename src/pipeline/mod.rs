//! Pipeline entry points for relay operations.
//!
//! - `filter_new`: Select entries past an account's watermark
//! - `SyncEngine::run_pass`: Fetch, deliver and checkpoint every account once
//! - `run_daemon`: Repeat passes until interrupted

pub mod daemon;
pub mod sync;
mod watermark;

pub use daemon::{pass_interval, run_daemon, shutdown_signal};
pub use sync::{AccountOutcome, AccountReport, PassStats, SyncEngine};
pub use watermark::filter_new;
