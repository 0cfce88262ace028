//! Difficulty targets over the 256-bit hash space.

use crate::error::MinerError;

/// Width of the hash space in bytes.
pub const HASH_BYTES: usize = 32;

/// The value a candidate hash must not exceed.
///
/// A target is `floor(2^256 / difficulty)` stored big-endian, so higher
/// difficulty shrinks the band of acceptable hashes. Difficulty 1
/// accepts every hash and saturates to all ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target([u8; HASH_BYTES]);

impl Target {
    /// Derives the target for `difficulty`.
    pub fn from_difficulty(difficulty: u64) -> Result<Self, MinerError> {
        if difficulty == 0 {
            return Err(MinerError::ZeroDifficulty);
        }
        if difficulty == 1 {
            // 2^256 itself does not fit the hash width; every 256-bit
            // hash passes, so saturate.
            return Ok(Target([0xFF; HASH_BYTES]));
        }

        // Long division of 2^256 (one leading 1, then 32 zero bytes) by
        // the difficulty, one byte of quotient at a time.
        let divisor = difficulty as u128;
        let mut quotient = [0u8; HASH_BYTES];
        let mut rem: u128 = 1;
        for digit in quotient.iter_mut() {
            let cur = rem << 8;
            *digit = (cur / divisor) as u8;
            rem = cur % divisor;
        }
        Ok(Target(quotient))
    }

    /// Whether `hash` falls within the target band.
    ///
    /// Hashes compare as 256-bit big-endian integers; the boundary
    /// value itself is accepted.
    pub fn is_met_by(&self, hash: &[u8; HASH_BYTES]) -> bool {
        hash[..] <= self.0[..]
    }

    /// The target value as big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    /// Uppercase hex rendering, for status output and log lines.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}
