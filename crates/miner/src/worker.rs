//! Nonce search over a segment of the u64 space.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::target::{Target, HASH_BYTES};

/// Hashes attempted between updates of the shared counter.
///
/// Workers batch their progress so the hot loop touches the shared
/// counter rarely; the remainder is flushed when the worker exits.
pub const REPORT_BATCH: u64 = 0x8000;

/// Hash of one candidate: the payload followed by the nonce in
/// little-endian byte order.
pub fn hash_candidate(payload: &[u8], nonce: u64) -> [u8; HASH_BYTES] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(payload);
    hasher.update(&nonce.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// Walks the segment `[min, max]` starting at `seed` until a nonce
/// meets `target`, the segment is exhausted, or `stop` is raised.
///
/// The walk increments from the seed, wraps from `max` back to `min`,
/// and gives up once it returns to the seed with nothing found, having
/// then tried every nonce in the segment exactly once. Attempted hashes
/// are added to `hashes` in batches.
///
/// `seed` must lie within the segment.
pub fn search_range(
    payload: &[u8],
    target: &Target,
    min: u64,
    max: u64,
    seed: u64,
    stop: &AtomicBool,
    hashes: &AtomicU64,
) -> Option<u64> {
    debug_assert!(min <= seed && seed <= max);

    let mut nonce = seed;
    let mut pending: u64 = 0;
    let found = loop {
        if stop.load(Ordering::Relaxed) {
            break None;
        }

        let hash = hash_candidate(payload, nonce);
        pending += 1;
        if pending == REPORT_BATCH {
            hashes.fetch_add(pending, Ordering::Relaxed);
            pending = 0;
        }

        if target.is_met_by(&hash) {
            break Some(nonce);
        }

        nonce = if nonce == max { min } else { nonce + 1 };
        if nonce == seed {
            // Full lap with nothing found; this segment is dry.
            break None;
        }
    };

    if pending > 0 {
        hashes.fetch_add(pending, Ordering::Relaxed);
    }
    found
}
