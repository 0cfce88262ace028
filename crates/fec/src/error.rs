//! Error types for the redundancy-bitmap crate.

use thiserror::Error;

/// Convenience alias for fallible bitmap operations.
pub type FecResult<T> = Result<T, FecError>;

/// Errors raised by [`BitVec`](crate::BitVec) and
/// [`ArrivalWindow`](crate::ArrivalWindow) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FecError {
    /// Bit access outside `[0, bit_len)`.
    #[error("bit index {index} out of range for a {bit_len}-bit vector")]
    IndexOutOfRange {
        /// The offending bit index.
        index: usize,
        /// Length of the vector that rejected it.
        bit_len: usize,
    },

    /// Unit-wise combination across vectors of different widths.
    #[error("unit length mismatch: {left} units vs {right}")]
    UnitLengthMismatch {
        /// Unit length of the first operand checked.
        left: usize,
        /// Unit length of the second operand checked.
        right: usize,
    },

    /// Window size that is zero or not a whole number of units.
    #[error("window size {win_size} is not a positive multiple of 8 bits")]
    InvalidWindowSize {
        /// The rejected window size, in slots.
        win_size: usize,
    },

    /// Group snapshot starting off a unit boundary.
    #[error("group start {begin_seq} is not unit aligned")]
    UnalignedGroup {
        /// Requested first sequence number of the group.
        begin_seq: u32,
    },

    /// Group snapshot wider than the window it reads from.
    #[error("group span of {span} bits exceeds the {win_size}-bit window")]
    GroupSpanTooLarge {
        /// Requested span, in slots.
        span: usize,
        /// Size of the window, in slots.
        win_size: usize,
    },
}
