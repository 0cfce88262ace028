//! Variable-length bit vector over owned or borrowed storage.
//!
//! Packet groups carry one redundancy marker per slot; this container
//! gives the transport layer bit-level access to those markers, either
//! in storage it allocates itself or zero-copy over a window snapshot
//! a caller already holds.

use crate::error::{FecError, FecResult};

/// Number of bits per storage unit.
pub const UNIT_BITS: usize = 8;

/// Backing storage for a [`BitVec`].
///
/// Exactly one mode holds at a time: the vector owns its units, borrows
/// them from caller memory, or holds nothing at all.
#[derive(Debug, Default)]
enum Storage<'buf> {
    #[default]
    Empty,
    Owned(Vec<u8>),
    Borrowed(&'buf mut [u8]),
}

impl Storage<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Empty => &[],
            Storage::Owned(units) => units,
            Storage::Borrowed(units) => units,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Empty => &mut [],
            Storage::Owned(units) => units,
            Storage::Borrowed(units) => units,
        }
    }
}

/// Redundancy-marker bitmap for one group of packets.
///
/// Bits are numbered MSB-first: bit 0 is the high-order bit of unit 0,
/// bit 7 its low-order bit, bit 8 the high-order bit of unit 1, and so
/// on. The vector is `bit_len` bits wide and occupies
/// `ceil(bit_len / 8)` units; trailing bits of the last unit are slack.
///
/// Storage is either owned ([`BitVec::new`]) or borrowed from the
/// caller ([`BitVec::attach`]). In borrowed mode the vector never
/// resizes or frees the memory, it only reads and writes within it, and
/// the borrow keeps the owner from touching the buffer until the vector
/// is dropped or detached.
///
/// An extension flag byte rides alongside the bits; the transport layer
/// uses it to tag which marker scheme stamped the group.
#[derive(Debug, Default)]
pub struct BitVec<'buf> {
    bit_len: usize,
    unit_len: usize,
    ext_flag: u8,
    storage: Storage<'buf>,
}

impl<'buf> BitVec<'buf> {
    /// Creates an owned vector of `bit_len` zeroed bits with a zero flag.
    ///
    /// A zero `bit_len` yields the same detached vector as
    /// [`BitVec::default`].
    pub fn new(bit_len: usize) -> Self {
        let unit_len = unit_len_for(bit_len);
        let storage = if unit_len == 0 {
            Storage::Empty
        } else {
            Storage::Owned(vec![0; unit_len])
        };
        BitVec {
            bit_len,
            unit_len,
            ext_flag: 0,
            storage,
        }
    }

    /// Rebinds the vector to caller-owned storage without copying.
    ///
    /// Previously owned units are released first. `bit_len` is taken at
    /// face value and the unit length derived from it; `buf` must hold
    /// at least that many units or later accesses past its end panic.
    /// Attaching with a zero `bit_len` is the same as [`BitVec::detach`].
    pub fn attach(&mut self, buf: &'buf mut [u8], bit_len: usize, flag: u8) {
        if bit_len == 0 {
            self.detach();
            return;
        }
        self.bit_len = bit_len;
        self.unit_len = unit_len_for(bit_len);
        self.ext_flag = flag;
        self.storage = Storage::Borrowed(buf);
    }

    /// Returns the vector to the detached state.
    ///
    /// Owned units are released; a borrowed reference is dropped without
    /// touching the owner's memory. Safe to call at any time, including
    /// on an already detached vector.
    pub fn detach(&mut self) {
        self.bit_len = 0;
        self.unit_len = 0;
        self.ext_flag = 0;
        self.storage = Storage::Empty;
    }

    /// Fills every unit with `pattern` and sets the extension flag.
    ///
    /// The same byte is replicated across all `unit_len` units, stamping
    /// one fixed marker layout per unit. On a detached vector there is
    /// nothing to fill and the call leaves the flag untouched.
    pub fn fill_pattern(&mut self, pattern: u8, flag: u8) {
        if self.bit_len == 0 {
            return;
        }
        let unit_len = self.unit_len;
        self.storage.as_mut_slice()[..unit_len].fill(pattern);
        self.ext_flag = flag;
    }

    /// Sets or clears the bit at `index`.
    pub fn set_bit(&mut self, index: usize, value: bool) -> FecResult<()> {
        if index >= self.bit_len {
            return Err(FecError::IndexOutOfRange {
                index,
                bit_len: self.bit_len,
            });
        }
        let (unit, mask) = unit_and_mask(index);
        let units = self.storage.as_mut_slice();
        if value {
            units[unit] |= mask;
        } else {
            units[unit] &= !mask;
        }
        Ok(())
    }

    /// Reads the bit at `index`.
    pub fn get_bit(&self, index: usize) -> FecResult<bool> {
        if index >= self.bit_len {
            return Err(FecError::IndexOutOfRange {
                index,
                bit_len: self.bit_len,
            });
        }
        let (unit, mask) = unit_and_mask(index);
        Ok(self.storage.as_slice()[unit] & mask != 0)
    }

    /// Replaces the receiver's units with `a XOR b`, unit by unit.
    ///
    /// All three vectors must share the same unit length. The receiver's
    /// length and flag are left as they are; only its units change.
    pub fn xor_from(&mut self, a: &BitVec<'_>, b: &BitVec<'_>) -> FecResult<()> {
        check_unit_len(self.unit_len, a.unit_len)?;
        check_unit_len(a.unit_len, b.unit_len)?;
        let out = self.storage.as_mut_slice();
        let (a_units, b_units) = (a.units(), b.units());
        for i in 0..self.unit_len {
            out[i] = a_units[i] ^ b_units[i];
        }
        Ok(())
    }

    /// XORs `other` into the receiver, unit by unit.
    pub fn xor_with(&mut self, other: &BitVec<'_>) -> FecResult<()> {
        check_unit_len(self.unit_len, other.unit_len)?;
        let out = self.storage.as_mut_slice();
        let other_units = other.units();
        for i in 0..self.unit_len {
            out[i] ^= other_units[i];
        }
        Ok(())
    }

    /// Checks whether every marker set in the receiver is still set in
    /// `other`.
    ///
    /// The receiver holds the expected marker layout for the group, as
    /// stamped by [`BitVec::fill_pattern`]; `other` reflects which slots
    /// actually arrived. A single expected marker cleared in `other`
    /// means the group's redundancy did not survive and the check
    /// returns `false`. A receiver with no markers set trivially
    /// survives.
    pub fn has_surviving_redundancy(&self, other: &BitVec<'_>) -> FecResult<bool> {
        check_unit_len(self.unit_len, other.unit_len)?;
        let (mine, theirs) = (self.units(), other.units());
        for i in 0..self.unit_len {
            if mine[i] & !theirs[i] != 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Reads bit `index` of the extension flag, MSB-first like the
    /// vector itself. Indexes past the flag byte read as `false`.
    pub fn flag_bit(&self, index: usize) -> bool {
        if index >= UNIT_BITS {
            return false;
        }
        self.ext_flag >> (UNIT_BITS - 1 - index) & 1 != 0
    }

    /// Counts set bits among the first `upto_bits` bits.
    ///
    /// Bits past the end of the vector are never counted, so any
    /// `upto_bits >= bit_len` counts the whole vector.
    pub fn count_ones(&self, upto_bits: usize) -> usize {
        let upto = upto_bits.min(self.bit_len);
        let units = self.units();
        let full_units = upto / UNIT_BITS;
        let mut total: usize = units[..full_units]
            .iter()
            .map(|unit| unit.count_ones() as usize)
            .sum();
        for index in full_units * UNIT_BITS..upto {
            let (unit, mask) = unit_and_mask(index);
            if units[unit] & mask != 0 {
                total += 1;
            }
        }
        total
    }

    /// Width of the vector in bits. Zero when detached.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Number of storage units covering the bits.
    pub fn unit_len(&self) -> usize {
        self.unit_len
    }

    /// The extension flag byte.
    pub fn ext_flag(&self) -> u8 {
        self.ext_flag
    }

    /// Whether the vector currently has storage, owned or borrowed.
    pub fn is_attached(&self) -> bool {
        !matches!(self.storage, Storage::Empty)
    }

    /// Whether the vector owns its storage.
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// Whether the vector borrows caller storage.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.storage, Storage::Borrowed(_))
    }

    /// Read-only view of the backing units, exactly as supplied.
    ///
    /// For owned storage this is `unit_len` units; for borrowed storage
    /// it is the whole attached buffer. Empty when detached.
    pub fn units(&self) -> &[u8] {
        self.storage.as_slice()
    }

    /// Uppercase hex rendering of the backing units, for log lines.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.units())
    }
}

/// Units needed to cover `bit_len` bits.
fn unit_len_for(bit_len: usize) -> usize {
    bit_len.div_ceil(UNIT_BITS)
}

/// Maps a bit index to its storage unit and MSB-first mask.
fn unit_and_mask(index: usize) -> (usize, u8) {
    (index / UNIT_BITS, 1 << (UNIT_BITS - 1 - index % UNIT_BITS))
}

fn check_unit_len(left: usize, right: usize) -> FecResult<()> {
    if left != right {
        return Err(FecError::UnitLengthMismatch { left, right });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_allocates_zeroed_units() {
        let v = BitVec::new(64);
        assert_eq!(v.bit_len(), 64);
        assert_eq!(v.unit_len(), 8);
        assert_eq!(v.ext_flag(), 0);
        assert!(v.is_owned());
        assert!(v.units().iter().all(|&unit| unit == 0));
    }

    #[test]
    fn test_unit_len_rounds_up() {
        assert_eq!(BitVec::new(1).unit_len(), 1);
        assert_eq!(BitVec::new(8).unit_len(), 1);
        assert_eq!(BitVec::new(9).unit_len(), 2);
        assert_eq!(BitVec::new(63).unit_len(), 8);
        assert_eq!(BitVec::new(65).unit_len(), 9);
    }

    #[test]
    fn test_new_zero_bits_is_detached() {
        let v = BitVec::new(0);
        assert!(!v.is_attached());
        assert_eq!(v.bit_len(), 0);
        assert_eq!(v.unit_len(), 0);
        assert!(v.units().is_empty());
    }

    #[test]
    fn test_msb_first_bit_order() {
        // Bits 1 and 2 of unit 0 are 0b0110_0000 = 96.
        let mut v = BitVec::new(64);
        v.set_bit(1, true).unwrap();
        v.set_bit(2, true).unwrap();
        assert_eq!(v.units()[0], 96);
        assert!(v.units()[1..].iter().all(|&unit| unit == 0));
        v.set_bit(3, false).unwrap();
        assert!(!v.get_bit(3).unwrap());
        assert_eq!(v.units()[0], 96);
    }

    #[test]
    fn test_set_get_roundtrip_and_clear() {
        let mut v = BitVec::new(20);
        for index in [0, 7, 8, 13, 19] {
            assert!(!v.get_bit(index).unwrap());
            v.set_bit(index, true).unwrap();
            assert!(v.get_bit(index).unwrap());
            // Setting the value a bit already holds changes nothing.
            v.set_bit(index, true).unwrap();
            assert!(v.get_bit(index).unwrap());
        }
        v.set_bit(13, false).unwrap();
        assert!(!v.get_bit(13).unwrap());
        v.set_bit(13, false).unwrap();
        assert!(!v.get_bit(13).unwrap());
    }

    #[test]
    fn test_index_out_of_range() {
        let mut v = BitVec::new(16);
        let err = v.set_bit(16, true).unwrap_err();
        assert_eq!(
            err,
            FecError::IndexOutOfRange {
                index: 16,
                bit_len: 16
            }
        );
        assert!(v.get_bit(usize::MAX).is_err());
        // The vector is untouched after a rejected access.
        assert!(v.units().iter().all(|&unit| unit == 0));
    }

    #[test]
    fn test_detached_vector_rejects_all_indexes() {
        let v = BitVec::default();
        assert!(v.get_bit(0).is_err());
    }

    #[test]
    fn test_fill_pattern_stamps_units_and_flag() {
        let mut v = BitVec::new(24);
        v.fill_pattern(0x80, 1);
        assert_eq!(v.units(), &[0x80, 0x80, 0x80]);
        assert_eq!(v.ext_flag(), 1);
        assert!(v.get_bit(0).unwrap());
        assert!(!v.get_bit(1).unwrap());
        assert!(v.get_bit(8).unwrap());
    }

    #[test]
    fn test_fill_pattern_on_detached_is_noop() {
        let mut v = BitVec::default();
        v.fill_pattern(0xFF, 7);
        assert!(!v.is_attached());
        assert_eq!(v.ext_flag(), 0);
    }

    #[test]
    fn test_attach_borrows_without_copying() {
        let mut buf = [1u8, 2, 3];
        let mut v = BitVec::default();
        v.attach(&mut buf, 24, 5);
        assert!(v.is_borrowed());
        assert_eq!(v.bit_len(), 24);
        assert_eq!(v.unit_len(), 3);
        assert_eq!(v.ext_flag(), 5);
        assert_eq!(v.units(), &[1, 2, 3]);
    }

    #[test]
    fn test_attach_unit_len_follows_bit_len_not_buffer() {
        // The buffer stays 3 units while the claimed width walks from 1
        // to 63 bits; the unit length must track the width alone.
        for bit_len in 1..=63usize {
            let mut buf = [1u8, 2, 3];
            let mut v = BitVec::default();
            v.attach(&mut buf, bit_len, 0);
            assert_eq!(v.unit_len(), bit_len.div_ceil(8));
            assert_eq!(v.bit_len(), bit_len);
            assert_eq!(v.units(), &[1, 2, 3]);
        }
    }

    #[test]
    fn test_attach_zero_bits_detaches() {
        let mut buf = [0xAAu8; 4];
        let mut v = BitVec::default();
        v.attach(&mut buf, 0, 9);
        assert!(!v.is_attached());
        assert_eq!(v.ext_flag(), 0);
    }

    #[test]
    fn test_writes_through_attached_buffer() {
        let mut buf = [0u8; 2];
        {
            let mut v = BitVec::default();
            v.attach(&mut buf, 16, 0);
            v.set_bit(0, true).unwrap();
            v.set_bit(15, true).unwrap();
        }
        assert_eq!(buf, [0x80, 0x01]);
    }

    #[test]
    fn test_detach_resets_everything() {
        let mut v = BitVec::new(32);
        v.fill_pattern(0xFF, 3);
        v.detach();
        assert_eq!(v.bit_len(), 0);
        assert_eq!(v.unit_len(), 0);
        assert_eq!(v.ext_flag(), 0);
        assert!(!v.is_attached());
        // Idempotent.
        v.detach();
        assert!(!v.is_attached());
    }

    #[test]
    fn test_detach_leaves_borrowed_memory_alone() {
        let mut buf = [0xAB, 0xCD];
        {
            let mut v = BitVec::default();
            v.attach(&mut buf, 16, 1);
            v.detach();
        }
        assert_eq!(buf, [0xAB, 0xCD]);
    }

    #[test]
    fn test_xor_from_three_operands() {
        let mut a = BitVec::new(16);
        let mut b = BitVec::new(16);
        a.set_bit(0, true).unwrap();
        a.set_bit(9, true).unwrap();
        b.set_bit(0, true).unwrap();
        b.set_bit(10, true).unwrap();
        let mut out = BitVec::new(16);
        out.xor_from(&a, &b).unwrap();
        assert!(!out.get_bit(0).unwrap());
        assert!(out.get_bit(9).unwrap());
        assert!(out.get_bit(10).unwrap());
        assert_eq!(out.count_ones(16), 2);
    }

    #[test]
    fn test_xor_with_matches_xor_from() {
        let mut a = BitVec::new(40);
        let mut b = BitVec::new(40);
        for index in [0, 3, 17, 39] {
            a.set_bit(index, true).unwrap();
        }
        for index in [3, 17, 22] {
            b.set_bit(index, true).unwrap();
        }
        let mut out = BitVec::new(40);
        out.xor_from(&a, &b).unwrap();
        a.xor_with(&b).unwrap();
        assert_eq!(a.units(), out.units());
    }

    #[test]
    fn test_xor_rejects_mismatched_unit_len() {
        let mut out = BitVec::new(16);
        let a = BitVec::new(16);
        let b = BitVec::new(24);
        let err = out.xor_from(&a, &b).unwrap_err();
        assert_eq!(err, FecError::UnitLengthMismatch { left: 2, right: 3 });
        let err = out.xor_with(&b).unwrap_err();
        assert_eq!(err, FecError::UnitLengthMismatch { left: 2, right: 3 });
    }

    #[test]
    fn test_xor_compatible_when_unit_len_matches() {
        // 63 and 64 bits both occupy 8 units, so they combine.
        let mut out = BitVec::new(63);
        let other = BitVec::new(64);
        assert!(out.xor_with(&other).is_ok());
    }

    #[test]
    fn test_survival_all_markers_present() {
        let mut expected = BitVec::new(64);
        let mut observed = BitVec::new(64);
        expected.fill_pattern(0x80, 1);
        observed.fill_pattern(0xFF, 1);
        assert!(expected.has_surviving_redundancy(&observed).unwrap());
    }

    #[test]
    fn test_survival_fails_on_one_missing_marker() {
        let mut expected = BitVec::new(64);
        let mut observed = BitVec::new(64);
        expected.fill_pattern(0x80, 1);
        observed.fill_pattern(0x80, 1);
        assert!(expected.has_surviving_redundancy(&observed).unwrap());
        observed.set_bit(0, false).unwrap();
        assert!(!expected.has_surviving_redundancy(&observed).unwrap());
    }

    #[test]
    fn test_survival_ignores_extra_bits_in_other() {
        let mut expected = BitVec::new(32);
        let mut observed = BitVec::new(32);
        expected.set_bit(5, true).unwrap();
        observed.set_bit(5, true).unwrap();
        observed.set_bit(6, true).unwrap();
        observed.set_bit(31, true).unwrap();
        assert!(expected.has_surviving_redundancy(&observed).unwrap());
    }

    #[test]
    fn test_survival_with_no_markers_is_trivial() {
        let expected = BitVec::new(24);
        let observed = BitVec::new(24);
        assert!(expected.has_surviving_redundancy(&observed).unwrap());
    }

    #[test]
    fn test_survival_rejects_mismatched_unit_len() {
        let expected = BitVec::new(24);
        let observed = BitVec::new(40);
        assert!(expected.has_surviving_redundancy(&observed).is_err());
    }

    #[test]
    fn test_flag_bit_msb_first() {
        let mut v = BitVec::new(8);
        v.fill_pattern(0, 0b1010_0000);
        assert!(v.flag_bit(0));
        assert!(!v.flag_bit(1));
        assert!(v.flag_bit(2));
        assert!(!v.flag_bit(7));
        assert!(!v.flag_bit(8));
        assert!(!v.flag_bit(100));
    }

    #[test]
    fn test_count_ones_partial_unit() {
        let mut v = BitVec::new(16);
        v.set_bit(0, true).unwrap();
        v.set_bit(7, true).unwrap();
        v.set_bit(8, true).unwrap();
        assert_eq!(v.count_ones(1), 1);
        assert_eq!(v.count_ones(8), 2);
        assert_eq!(v.count_ones(9), 3);
        assert_eq!(v.count_ones(16), 3);
        assert_eq!(v.count_ones(1000), 3);
    }

    #[test]
    fn test_to_hex_uppercase() {
        let mut v = BitVec::new(16);
        v.set_bit(0, true).unwrap();
        v.set_bit(15, true).unwrap();
        assert_eq!(v.to_hex(), "8001");
    }
}
