//! Low-level byte order and safe reading/writing utilities for the binary record format.
//!
//! This module provides endian-aware, bounds-checked reading of primitive types from byte
//! buffers and the matching append-style writers used when encoding records. The compact
//! binary codec stores everything little-endian, except for counts and values which use
//! the 7-bit variable length encoding (see [`write_7bit_encoded`]).
//!
//! # Key Components
//!
//! - [`ByteIO`] - Trait defining endian-aware conversion for primitive integer types
//! - [`read_le_at`] - Read a value at an offset with auto-advance
//! - [`write_le`] - Append a value in little-endian byte order
//! - [`write_7bit_encoded`] - Append a 7-bit variable length encoded integer
//! - [`write_prefixed_string_utf8`] - Append a length-prefixed UTF-8 string
//!
//! # Error Handling
//!
//! All reading functions return [`crate::Result<T>`] and will return
//! [`crate::Error::OutOfBounds`] if there are insufficient bytes in the buffer.

use crate::{Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data conversion.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait ByteIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_byte_io {
    ($($ty:ty),*) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_byte_io!(u8, u16, u32, u64);

/// Safely reads a value of type `T` in little-endian byte order from a data buffer at a specific offset.
///
/// This function reads from the specified offset and automatically advances the offset by the
/// number of bytes read.
///
/// # Arguments
///
/// * `data` - The byte buffer to read from
/// * `offset` - Mutable reference to the offset position (will be advanced after reading)
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
///
/// # Examples
///
/// ```rust,ignore
/// use sdrscope::file::io::read_le_at;
///
/// let data = [0x01, 0x00, 0x02, 0x00]; // Two u16 values: 1, 2
/// let mut offset = 0;
///
/// let first: u16 = read_le_at(&data, &mut offset)?;
/// assert_eq!(first, 1);
/// assert_eq!(offset, 2);
/// # Ok::<(), sdrscope::Error>(())
/// ```
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Appends `value` to `buffer` in little-endian byte order.
pub fn write_le<T: ByteIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Appends `value` using the 7-bit variable length encoding.
///
/// Each byte carries 7 bits of the value, least significant group first, with the high
/// bit set on every byte except the last. Values below 128 take a single byte.
///
/// # Examples
///
/// ```rust,ignore
/// use sdrscope::file::io::write_7bit_encoded;
///
/// let mut buffer = Vec::new();
/// write_7bit_encoded(&mut buffer, 300);
/// assert_eq!(buffer, [0xAC, 0x02]);
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn write_7bit_encoded(buffer: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buffer.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buffer.push(value as u8);
}

/// Appends `value` as a 7-bit encoded byte length followed by its UTF-8 bytes.
pub fn write_prefixed_string_utf8(buffer: &mut Vec<u8>, value: &str) {
    write_7bit_encoded(buffer, value.len() as u64);
    buffer.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_le_at() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0xFF];
        let mut offset = 0;

        assert_eq!(read_le_at::<u16>(&data, &mut offset).unwrap(), 1);
        assert_eq!(read_le_at::<u32>(&data, &mut offset).unwrap(), 2);
        assert_eq!(offset, 6);
        assert_eq!(read_le_at::<u8>(&data, &mut offset).unwrap(), 0xFF);
        assert!(matches!(
            read_le_at::<u8>(&data, &mut offset),
            Err(OutOfBounds)
        ));
    }

    #[test]
    fn test_read_le_at_offset_overflow() {
        let data = [0u8; 4];
        let mut offset = usize::MAX;
        assert!(read_le_at::<u32>(&data, &mut offset).is_err());
    }

    #[test]
    fn test_write_le() {
        let mut buffer = Vec::new();
        write_le(&mut buffer, 0x0102u16);
        write_le(&mut buffer, 0x03u8);
        write_le(&mut buffer, 0x0000_0004u32);
        assert_eq!(buffer, [0x02, 0x01, 0x03, 0x04, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_write_7bit_encoded() {
        let mut buffer = Vec::new();
        write_7bit_encoded(&mut buffer, 0);
        write_7bit_encoded(&mut buffer, 127);
        write_7bit_encoded(&mut buffer, 128);
        assert_eq!(buffer, [0x00, 0x7F, 0x80, 0x01]);

        let mut buffer = Vec::new();
        write_7bit_encoded(&mut buffer, u64::MAX);
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn test_write_prefixed_string() {
        let mut buffer = Vec::new();
        write_prefixed_string_utf8(&mut buffer, "SDR");
        assert_eq!(buffer, [3, b'S', b'D', b'R']);
    }
}
