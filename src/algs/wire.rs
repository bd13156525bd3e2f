//! Fixed little-endian wire words for grid-internal messages.
//!
//! Index ranges travel as `2 * D` [`WireInt`]s (origin, then size); the
//! variable-size phase of a halo exchange ships one [`WireSize`] per entity.
//! Floating-point reductions travel as [`WireF64`].
//! Payload data is shipped as the raw bytes of the handle's `Pod` type.

use crate::topology::index_range::IndexRange;
use crate::topology::shift::Shift;
use bytemuck::{Pod, Zeroable};
use static_assertions::assert_eq_size;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Copy `bytes` into a freshly allocated, correctly aligned `Vec<T>`.
///
/// Trailing bytes that do not fill a whole `T` are ignored.
pub fn decode_vec<T: Pod>(bytes: &[u8]) -> Vec<T> {
    let n = match std::mem::size_of::<T>() {
        0 => 0,
        sz => bytes.len() / sz,
    };
    let mut out = vec![T::zeroed(); n];
    let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut out);
    let len = dst.len();
    dst.copy_from_slice(&bytes[..len]);
    out
}

/// A signed index on the wire.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireInt {
    pub v_le: i64,
}

impl WireInt {
    pub fn new(v: i64) -> Self {
        Self { v_le: v.to_le() }
    }
    pub fn get(&self) -> i64 {
        i64::from_le(self.v_le)
    }
}

/// A per-entity payload size on the wire.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireSize {
    pub n_le: u64,
}

impl WireSize {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// A floating-point value on the wire, stored as its little-endian bits.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireF64 {
    pub bits_le: u64,
}

impl WireF64 {
    pub fn new(v: f64) -> Self {
        Self {
            bits_le: v.to_bits().to_le(),
        }
    }
    pub fn get(&self) -> f64 {
        f64::from_bits(u64::from_le(self.bits_le))
    }
}

assert_eq_size!(WireInt, i64);
assert_eq_size!(WireSize, u64);
assert_eq_size!(WireF64, f64);

/// Encoded length of one index range of dimension `D`.
pub const fn range_wire_len<const D: usize>() -> usize {
    2 * D * std::mem::size_of::<WireInt>()
}

/// Origin and size only; the orientation is known to the receiver.
pub fn encode_range<const D: usize>(range: &IndexRange<D>) -> Vec<u8> {
    let words: Vec<WireInt> = range
        .origin()
        .iter()
        .chain(range.size().iter())
        .map(|&v| WireInt::new(v))
        .collect();
    cast_slice(&words).to_vec()
}

/// Inverse of [`encode_range`], tagging the result with `shift`.
pub fn decode_range<const D: usize>(bytes: &[u8], shift: Shift) -> IndexRange<D> {
    let words: Vec<WireInt> = decode_vec(bytes);
    let mut origin = [0i64; D];
    let mut size = [0i64; D];
    for i in 0..D {
        origin[i] = words.get(i).map_or(0, WireInt::get);
        size[i] = words.get(D + i).map_or(0, WireInt::get);
    }
    IndexRange::new(origin, size, shift)
}

pub fn encode_sizes(sizes: &[usize]) -> Vec<u8> {
    let words: Vec<WireSize> = sizes.iter().map(|&n| WireSize::new(n)).collect();
    cast_slice(&words).to_vec()
}

pub fn decode_sizes(bytes: &[u8]) -> Vec<usize> {
    decode_vec::<WireSize>(bytes).iter().map(WireSize::get).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_survives_the_wire() {
        let r = IndexRange::<3>::new([-2, 0, 7], [4, 1, 3], Shift::from_bits(0b101));
        let bytes = encode_range(&r);
        assert_eq!(bytes.len(), range_wire_len::<3>());
        assert_eq!(decode_range::<3>(&bytes, r.shift()), r);
    }

    #[test]
    fn decode_vec_realigns_unaligned_input() {
        let sizes = encode_sizes(&[3, 0, 12]);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&sizes);
        assert_eq!(decode_sizes(&shifted[1..]), vec![3, 0, 12]);
    }

    #[test]
    fn floats_keep_their_bits() {
        let words = [WireF64::new(-0.0), WireF64::new(1.5), WireF64::new(f64::INFINITY)];
        let back: Vec<f64> = decode_vec::<WireF64>(cast_slice(&words))
            .iter()
            .map(WireF64::get)
            .collect();
        assert_eq!(back[0].to_bits(), (-0.0f64).to_bits());
        assert_eq!(back[1], 1.5);
        assert_eq!(back[2], f64::INFINITY);
    }
}
