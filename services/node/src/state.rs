//! Shared runtime state and the node's background tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, error, info};

use weft_miner::{Miner, Solution};
use weft_store::{KeyValueStore, SqliteStore, WriteBatch};

use crate::config::NodeConfig;
use crate::stats::{self, MemoryReport};

/// A found solution as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub nonce: u64,
    /// Uppercase hex of the winning hash.
    pub hash: String,
    /// Difficulty of the round that produced it.
    pub difficulty: u64,
    /// Wall-clock time the record was written, Unix milliseconds.
    pub found_at_ms: u64,
}

/// Everything the RPC handlers and background tasks share.
pub struct NodeState {
    config: NodeConfig,
    store: Arc<dyn KeyValueStore>,
    miner: Mutex<Miner>,
    system: Mutex<System>,
    started_at: Instant,
    recorded_solutions: AtomicU64,
}

impl NodeState {
    /// Opens the durable store under the config's data dir and builds
    /// an idle mining engine.
    pub fn open(config: NodeConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = SqliteStore::open(config.data_dir.join("node.db"))?;
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(
        config: NodeConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> anyhow::Result<Self> {
        let miner = Miner::new(config.miner.threads, config.miner.difficulty)?;
        Ok(Self {
            config,
            store,
            miner: Mutex::new(miner),
            system: Mutex::new(System::new()),
            started_at: Instant::now(),
            recorded_solutions: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Exclusive access to the mining engine.
    ///
    /// Callers hold the guard only for the engine call itself; none of
    /// the engine's methods block beyond a worker join.
    pub fn miner(&self) -> MutexGuard<'_, Miner> {
        match self.miner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Removes the pending solution from the engine, if one is waiting.
    pub fn take_solution(&self) -> Option<Solution> {
        self.miner().take_solution()
    }

    /// Current memory numbers for this process and the machine.
    pub fn sample_memory(&self) -> MemoryReport {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        stats::sample(&mut system)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Solutions persisted to the store since this process started.
    pub fn recorded_solutions(&self) -> u64 {
        self.recorded_solutions.load(Ordering::Relaxed)
    }

    /// Persists a solution: the record itself plus the last-solution
    /// pointer, staged in one batch so readers never see them split.
    ///
    /// The record keeps the difficulty the solution was found at, which
    /// can differ from the engine's current difficulty by the time the
    /// recorder drains it.
    pub fn record_solution(&self, solution: &Solution) -> anyhow::Result<()> {
        let record = SolutionRecord {
            nonce: solution.nonce,
            hash: solution.hash_hex(),
            difficulty: solution.difficulty,
            found_at_ms: unix_millis(),
        };
        let value = serde_json::to_vec(&record)?;

        let mut batch = WriteBatch::new();
        let key = format!("solutions/{}", record.hash);
        batch.put(key.as_bytes(), &value);
        batch.put(b"meta/last_solution", &value);
        self.store.commit(&batch)?;
        self.recorded_solutions.fetch_add(1, Ordering::Relaxed);

        info!(nonce = record.nonce, hash = %record.hash, "solution recorded");
        Ok(())
    }

    /// Stops the mining engine; called on shutdown.
    pub fn shutdown(&self) {
        self.miner().stop();
        info!("node state shut down");
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Moves found solutions from the engine into the store.
pub fn spawn_solution_recorder(state: Arc<NodeState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            if let Some(solution) = state.take_solution() {
                if let Err(e) = state.record_solution(&solution) {
                    error!("failed to record solution: {}", e);
                }
            }
        }
    });
}

/// Logs a memory sample every five seconds.
pub fn spawn_memory_reporter(state: Arc<NodeState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            let report = state.sample_memory();
            debug!(
                resident_bytes = report.resident_bytes,
                virtual_bytes = report.virtual_bytes,
                system_used_bytes = report.system_used_bytes,
                system_total_bytes = report.system_total_bytes,
                "memory usage"
            );
        }
    });
}
