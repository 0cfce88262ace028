//! Error types for the mining crate.

use thiserror::Error;

/// Errors raised when configuring or driving the miner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MinerError {
    /// Difficulty zero would make the target division meaningless.
    #[error("difficulty must be nonzero")]
    ZeroDifficulty,

    /// A second start was requested while workers are still live.
    #[error("miner already running")]
    AlreadyRunning,

    /// The OS refused to start a worker thread.
    #[error("worker spawn failed: {reason}")]
    WorkerSpawn {
        /// Error text from the failed spawn call.
        reason: String,
    },
}
