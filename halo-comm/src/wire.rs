//! Fixed-size binary encoding of the value types that cross worker
//! boundaries.
//!
//! Every backend moves bytes. A type that implements [`Wire`] knows its
//! encoded width and how to write itself to (and read itself from) a
//! little-endian byte slice of exactly that width.
use crate::error::{CommError, Result};

/// Value type with a fixed-size little-endian wire representation
pub trait Wire: Copy + Send + 'static {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Write `self` into `out`, which has length [`Wire::SIZE`]
    fn encode(&self, out: &mut [u8]);

    /// Read a value from `bytes`, which has length [`Wire::SIZE`]
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire {
    ($($t:ty),*) => {
        $(
            impl Wire for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_wire!(f32, f64, i32, i64, u8, u32, u64);

/// Encode a slice into a freshly allocated byte buffer
pub fn encode_slice<T: Wire>(data: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; data.len() * T::SIZE];
    for (v, chunk) in data.iter().zip(bytes.chunks_exact_mut(T::SIZE)) {
        v.encode(chunk);
    }
    bytes
}

/// Decode `bytes` into `buf`. The byte count must match exactly.
pub fn decode_into<T: Wire>(bytes: &[u8], buf: &mut [T]) -> Result<()> {
    let expected = buf.len() * T::SIZE;
    if bytes.len() != expected {
        return Err(CommError::SizeMismatch {
            expected,
            received: bytes.len(),
        });
    }
    for (v, chunk) in buf.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
        *v = T::decode(chunk);
    }
    Ok(())
}
