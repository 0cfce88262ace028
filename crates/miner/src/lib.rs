//! Proof-of-work mining over the 256-bit hash space.
//!
//! A round hashes a fixed payload against candidate nonces until one
//! lands at or below the difficulty target. [`Target`] owns the
//! `2^256 / difficulty` arithmetic, [`search_range`] walks one segment
//! of the nonce space, and [`Miner`] fans the search out across worker
//! threads with shared stop and progress signalling.

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod target;
pub mod worker;

pub use engine::{Miner, MinerStatus, Solution, MAX_THREADS};
pub use error::MinerError;
pub use target::{Target, HASH_BYTES};
pub use worker::{hash_candidate, search_range};
