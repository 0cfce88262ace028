//! Redundancy-marker bitmaps for packet groups.
//!
//! The transport layer stamps every group of packets it sends with
//! per-unit redundancy markers and checks on receipt whether the group
//! arrived with its redundancy intact. This crate holds the two pieces
//! of state that flow makes bit-level decisions over:
//!
//! - [`BitVec`], a variable-length MSB-first bit vector that either
//!   owns its storage or borrows a caller buffer zero-copy, with
//!   unit-wise XOR combination and a marker-survival check between a
//!   stamped vector and an observed one.
//! - [`ArrivalWindow`], the circular arrival bitmap the receive path
//!   records sequence numbers into and snapshots group spans out of.
//!
//! Failures are ordinary values: bit accesses outside a vector and
//! combinations across mismatched widths come back as [`FecError`] for
//! the caller to handle, never as aborts.

#![warn(missing_docs)]

pub mod bitvec;
pub mod error;
pub mod window;

pub use bitvec::{BitVec, UNIT_BITS};
pub use error::{FecError, FecResult};
pub use window::ArrivalWindow;
