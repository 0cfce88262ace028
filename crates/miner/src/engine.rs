//! Multi-threaded nonce search engine.
//!
//! The engine carves the u64 nonce space into one segment per worker
//! thread, seeds each worker at a random point of its segment, and lets
//! them race. The first worker to meet the target publishes its
//! solution and raises the shared stop flag; the rest drain out on
//! their own.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::MinerError;
use crate::target::{Target, HASH_BYTES};
use crate::worker::{hash_candidate, search_range};

/// Upper bound on worker threads per engine; requested counts clamp
/// into `[1, MAX_THREADS]`.
pub const MAX_THREADS: usize = 256;

/// A nonce that met the target, with the hash that proved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The winning nonce.
    pub nonce: u64,
    /// The candidate hash it produced.
    pub hash: [u8; HASH_BYTES],
    /// Difficulty of the round that found it.
    pub difficulty: u64,
}

impl Solution {
    /// Uppercase hex of the winning hash.
    pub fn hash_hex(&self) -> String {
        hex::encode_upper(self.hash)
    }
}

/// Point-in-time snapshot of miner progress.
#[derive(Debug, Clone, Serialize)]
pub struct MinerStatus {
    /// Whether any worker threads are still searching.
    pub running: bool,
    /// Whether a solution is waiting to be taken.
    pub found: bool,
    /// Hashes attempted so far in this round.
    pub hashes: u64,
    /// The difficulty the round was started with.
    pub difficulty: u64,
    /// Number of worker threads.
    pub threads: usize,
}

/// State shared between the engine handle and its workers.
#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    hashes: AtomicU64,
    live_workers: AtomicUsize,
    solution: Mutex<Option<Solution>>,
}

impl Shared {
    fn solution_slot(&self) -> MutexGuard<'_, Option<Solution>> {
        match self.solution.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Nonce search engine over a fixed payload.
///
/// One engine runs one round at a time; starting a new round while
/// workers are live is an error, starting after a round ended discards
/// any solution that was never taken.
#[derive(Debug)]
pub struct Miner {
    threads: usize,
    difficulty: u64,
    target: Target,
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl Miner {
    /// Creates an idle engine.
    ///
    /// `threads` is clamped into `[1, MAX_THREADS]`; the difficulty
    /// must be nonzero.
    pub fn new(threads: usize, difficulty: u64) -> Result<Self, MinerError> {
        let target = Target::from_difficulty(difficulty)?;
        Ok(Miner {
            threads: threads.clamp(1, MAX_THREADS),
            difficulty,
            target,
            shared: Arc::new(Shared::default()),
            handles: Vec::new(),
        })
    }

    /// Launches the worker threads over disjoint nonce segments.
    ///
    /// Fails if a round is still live, or if the OS refuses a worker
    /// thread; in the latter case the workers already launched are
    /// stopped and joined before the error returns, leaving the engine
    /// idle and reusable.
    pub fn start(&mut self, payload: Vec<u8>) -> Result<(), MinerError> {
        if self.is_running() {
            return Err(MinerError::AlreadyRunning);
        }
        self.reap_finished_workers();

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.hashes.store(0, Ordering::SeqCst);
        *self.shared.solution_slot() = None;
        self.shared
            .live_workers
            .store(self.threads, Ordering::SeqCst);

        let segment = u64::MAX / self.threads as u64;
        let payload = Arc::new(payload);
        info!(
            threads = self.threads,
            difficulty = self.difficulty,
            target = %self.target.to_hex(),
            "mining started"
        );

        for index in 0..self.threads {
            let min = segment * index as u64;
            let max = if index == self.threads - 1 {
                u64::MAX
            } else {
                segment * (index as u64 + 1) - 1
            };
            let seed = rand::thread_rng().gen_range(min..=max);
            let shared = Arc::clone(&self.shared);
            let payload = Arc::clone(&payload);
            let target = self.target.clone();
            let difficulty = self.difficulty;
            let spawned = std::thread::Builder::new()
                .name(format!("miner-{index}"))
                .spawn(move || {
                    run_worker(index, &payload, &target, difficulty, min, max, seed, &shared);
                });
            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(err) => {
                    // Workers from this index on never started; take
                    // their share out of the live count, then wind down
                    // the ones that did.
                    self.shared.stop.store(true, Ordering::SeqCst);
                    self.shared
                        .live_workers
                        .fetch_sub(self.threads - index, Ordering::SeqCst);
                    self.reap_finished_workers();
                    return Err(MinerError::WorkerSpawn {
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Raises the stop flag and joins every worker.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.reap_finished_workers();
    }

    /// Whether any worker threads are still searching.
    pub fn is_running(&self) -> bool {
        self.shared.live_workers.load(Ordering::SeqCst) > 0
    }

    /// Snapshot of the current round.
    pub fn status(&self) -> MinerStatus {
        MinerStatus {
            running: self.is_running(),
            found: self.shared.solution_slot().is_some(),
            hashes: self.shared.hashes.load(Ordering::Relaxed),
            difficulty: self.difficulty,
            threads: self.threads,
        }
    }

    /// Removes and returns the solution, if one was found.
    pub fn take_solution(&self) -> Option<Solution> {
        self.shared.solution_slot().take()
    }

    /// The difficulty this engine searches at.
    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    /// Number of worker threads a round fans out to.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// The target candidates are checked against.
    pub fn target(&self) -> &Target {
        &self.target
    }

    fn reap_finished_workers(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("mining worker panicked");
            }
        }
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    index: usize,
    payload: &[u8],
    target: &Target,
    difficulty: u64,
    min: u64,
    max: u64,
    seed: u64,
    shared: &Shared,
) {
    debug!(worker = index, min, max, seed, "worker searching");
    match search_range(
        payload,
        target,
        min,
        max,
        seed,
        &shared.stop,
        &shared.hashes,
    ) {
        Some(nonce) => {
            let hash = hash_candidate(payload, nonce);
            let mut slot = shared.solution_slot();
            if slot.is_none() {
                info!(
                    worker = index,
                    nonce,
                    hash = %hex::encode_upper(hash),
                    "solution found"
                );
                *slot = Some(Solution {
                    nonce,
                    hash,
                    difficulty,
                });
            }
            drop(slot);
            shared.stop.store(true, Ordering::SeqCst);
        }
        None => {
            debug!(worker = index, "worker finished empty");
        }
    }
    shared.live_workers.fetch_sub(1, Ordering::SeqCst);
}
