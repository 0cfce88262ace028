//! Circular arrival bitmap for the receive path.
//!
//! Incoming sequence numbers are recorded modulo a fixed window, one
//! bit per slot. When all packets of a group have had their chance to
//! arrive, the group's span is snapshotted into a caller buffer and a
//! [`BitVec`](crate::BitVec) attached over it to run redundancy checks.

use crate::bitvec::UNIT_BITS;
use crate::error::{FecError, FecResult};

/// Fixed-size circular bitmap of arrived sequence numbers.
///
/// A sequence number `seq` maps to bit `seq % win_size`, MSB-first
/// within each unit, the same numbering as [`BitVec`](crate::BitVec).
/// Keeping the window a whole number of units means unit-aligned group
/// spans snapshot as plain byte copies.
#[derive(Debug)]
pub struct ArrivalWindow {
    win_size: usize,
    bitmap: Vec<u8>,
}

impl ArrivalWindow {
    /// Creates a window covering `win_size` sequence slots.
    ///
    /// `win_size` must be a positive multiple of [`UNIT_BITS`].
    pub fn new(win_size: usize) -> FecResult<Self> {
        if win_size == 0 || win_size % UNIT_BITS != 0 {
            return Err(FecError::InvalidWindowSize { win_size });
        }
        Ok(ArrivalWindow {
            win_size,
            bitmap: vec![0; win_size / UNIT_BITS],
        })
    }

    /// Marks or clears the arrival slot for `seq`.
    ///
    /// Clearing is how a slot is recycled once its group has been
    /// processed and the window slides past it.
    pub fn mark(&mut self, seq: u32, received: bool) {
        let slot = seq as usize % self.win_size;
        let (unit, mask) = (slot / UNIT_BITS, slot_mask(slot));
        if received {
            self.bitmap[unit] |= mask;
        } else {
            self.bitmap[unit] &= !mask;
        }
    }

    /// Whether the slot for `seq` is currently marked.
    pub fn is_marked(&self, seq: u32) -> bool {
        let slot = seq as usize % self.win_size;
        self.bitmap[slot / UNIT_BITS] & slot_mask(slot) != 0
    }

    /// Snapshots the group of `out.len() * 8` slots starting at
    /// `begin_seq` into `out`, wrapping around the window edge when the
    /// span crosses it.
    ///
    /// `begin_seq` must sit on a unit boundary and the span must not
    /// exceed the window. The copy is taken from the live bitmap, so
    /// the caller should only read groups whose slots are settled.
    pub fn copy_group(&self, begin_seq: u32, out: &mut [u8]) -> FecResult<()> {
        let span = out.len() * UNIT_BITS;
        if begin_seq as usize % UNIT_BITS != 0 {
            return Err(FecError::UnalignedGroup { begin_seq });
        }
        if span > self.win_size {
            return Err(FecError::GroupSpanTooLarge {
                span,
                win_size: self.win_size,
            });
        }
        if out.is_empty() {
            return Ok(());
        }
        let start = (begin_seq as usize % self.win_size) / UNIT_BITS;
        let to_edge = self.bitmap.len() - start;
        if out.len() <= to_edge {
            out.copy_from_slice(&self.bitmap[start..start + out.len()]);
        } else {
            let tail = out.len() - to_edge;
            out[..to_edge].copy_from_slice(&self.bitmap[start..]);
            out[to_edge..].copy_from_slice(&self.bitmap[..tail]);
        }
        Ok(())
    }

    /// Number of slots currently marked across the whole window.
    pub fn marked_count(&self) -> usize {
        self.bitmap
            .iter()
            .map(|unit| unit.count_ones() as usize)
            .sum()
    }

    /// Size of the window in slots.
    pub fn win_size(&self) -> usize {
        self.win_size
    }
}

/// MSB-first mask for a slot within its unit.
fn slot_mask(slot: usize) -> u8 {
    1 << (UNIT_BITS - 1 - slot % UNIT_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitvec::BitVec;

    #[test]
    fn test_new_rejects_bad_sizes() {
        assert!(matches!(
            ArrivalWindow::new(0),
            Err(FecError::InvalidWindowSize { win_size: 0 })
        ));
        assert!(ArrivalWindow::new(12).is_err());
        let window = ArrivalWindow::new(64).unwrap();
        assert_eq!(window.win_size(), 64);
    }

    #[test]
    fn test_mark_and_check_wrap_modulo_window() {
        let mut window = ArrivalWindow::new(64).unwrap();
        window.mark(3, true);
        assert!(window.is_marked(3));
        // 67 lands in the same slot as 3.
        assert!(window.is_marked(67));
        window.mark(67, false);
        assert!(!window.is_marked(3));
    }

    #[test]
    fn test_mark_is_msb_first_within_units() {
        let mut window = ArrivalWindow::new(32).unwrap();
        window.mark(0, true);
        window.mark(9, true);
        let mut snap = [0u8; 4];
        window.copy_group(0, &mut snap).unwrap();
        assert_eq!(snap, [0x80, 0x40, 0, 0]);
    }

    #[test]
    fn test_copy_group_straight_run() {
        let mut window = ArrivalWindow::new(64).unwrap();
        for seq in 16..24 {
            window.mark(seq, true);
        }
        let mut snap = [0u8; 2];
        window.copy_group(16, &mut snap).unwrap();
        assert_eq!(snap, [0xFF, 0x00]);
    }

    #[test]
    fn test_copy_group_wraps_around_edge() {
        let mut window = ArrivalWindow::new(32).unwrap();
        // Slots 24..32 live in the last unit, 32..40 wrap into the first.
        for seq in 24..40 {
            window.mark(seq, true);
        }
        let mut snap = [0u8; 2];
        window.copy_group(24, &mut snap).unwrap();
        assert_eq!(snap, [0xFF, 0xFF]);
    }

    #[test]
    fn test_copy_group_wrap_with_unequal_halves() {
        let mut window = ArrivalWindow::new(32).unwrap();
        for seq in 16..20 {
            window.mark(seq, true);
        }
        window.mark(28, true);
        window.mark(29, true);
        window.mark(2, true);
        // Three units starting at slot 16: two up to the edge, one wrapped.
        let mut snap = [0u8; 3];
        window.copy_group(16, &mut snap).unwrap();
        assert_eq!(snap, [0xF0, 0x0C, 0x20]);
    }

    #[test]
    fn test_copy_group_rejects_unaligned_start() {
        let window = ArrivalWindow::new(32).unwrap();
        let mut snap = [0u8; 1];
        assert!(matches!(
            window.copy_group(3, &mut snap),
            Err(FecError::UnalignedGroup { begin_seq: 3 })
        ));
    }

    #[test]
    fn test_copy_group_rejects_oversized_span() {
        let window = ArrivalWindow::new(32).unwrap();
        let mut snap = [0u8; 5];
        assert!(matches!(
            window.copy_group(0, &mut snap),
            Err(FecError::GroupSpanTooLarge {
                span: 40,
                win_size: 32
            })
        ));
    }

    #[test]
    fn test_marked_count_tracks_mark_and_clear() {
        let mut window = ArrivalWindow::new(64).unwrap();
        assert_eq!(window.marked_count(), 0);
        for seq in 0..10 {
            window.mark(seq, true);
        }
        assert_eq!(window.marked_count(), 10);
        window.mark(4, false);
        assert_eq!(window.marked_count(), 9);
    }

    #[test]
    fn test_snapshot_feeds_attached_vector() {
        let mut window = ArrivalWindow::new(64).unwrap();
        for seq in 8..16 {
            window.mark(seq, true);
        }
        window.mark(12, false);
        let mut snap = [0u8; 2];
        window.copy_group(8, &mut snap).unwrap();
        let mut v = BitVec::default();
        v.attach(&mut snap, 16, 0);
        assert!(v.get_bit(0).unwrap());
        assert!(!v.get_bit(4).unwrap());
        assert_eq!(v.count_ones(16), 7);
    }
}
