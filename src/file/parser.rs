//! Sequential, bounds-checked decoding of binary records.
//!
//! [`Parser`] walks a borrowed byte slice with an internal cursor. Every read checks the
//! remaining length first and fails with [`crate::Error::OutOfBounds`] instead of panicking,
//! which makes it safe to point at untrusted input such as a file handed to
//! [`crate::serialization::Serializable::load_from_file`].
//!
//! # Examples
//!
//! ```rust
//! use sdrscope::Parser;
//!
//! let data = [0x2A, 0x00, 0xAC, 0x02, 0x03, b'S', b'D', b'R'];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 42);
//! assert_eq!(parser.read_7bit_encoded()?, 300);
//! assert_eq!(parser.read_prefixed_string_utf8()?, "SDR");
//! assert!(!parser.has_more_data());
//! # Ok::<(), sdrscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, ByteIO},
    Result,
};

/// A cursor over a byte slice with bounds-checked primitive reads.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a type `T` from the current position in little-endian and advance.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are not enough bytes remaining.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at(self.data, &mut self.position)
    }

    /// Read a 7-bit variable length encoded unsigned integer.
    ///
    /// Each byte contributes its low 7 bits, least significant group first; a set high bit
    /// marks that another byte follows.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends mid-value, or
    /// [`crate::Error::CorruptData`] if the encoding does not fit in 64 bits.
    pub fn read_7bit_encoded(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;

        loop {
            let byte: u8 = self.read_le()?;

            // The tenth byte may only contribute the single remaining bit.
            if shift == 63 && byte > 1 {
                return Err(corrupt_error!(
                    "7-bit encoded integer overflow: value exceeds u64 capacity"
                ));
            }

            value |= u64::from(byte & 0x7F) << shift;

            if (byte & 0x80) == 0 {
                break;
            }

            shift += 7;
            if shift > 63 {
                return Err(corrupt_error!(
                    "7-bit encoded integer overflow: more than 10 bytes"
                ));
            }
        }

        Ok(value)
    }

    /// Reads a 7-bit encoded length and checks it against the remaining input.
    ///
    /// Every encoded element occupies at least one byte, so a count larger than the
    /// remaining input can be rejected before anything is allocated for it.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptData`] for counts that cannot possibly be satisfied.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_7bit_encoded()?;
        match usize::try_from(count) {
            Ok(count) if count <= self.remaining() => Ok(count),
            _ => Err(corrupt_error!(
                "element count {} exceeds the {} remaining bytes",
                count,
                self.remaining()
            )),
        }
    }

    /// Reads a slice of bytes of the specified length from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `length` bytes would exceed the data.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(crate::Error::OutOfBounds)?;

        if end > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a UTF-8 string prefixed with its 7-bit encoded byte length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length or
    /// [`crate::Error::CorruptData`] for invalid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_count()?;
        let bytes = self.read_bytes(length)?;

        match std::str::from_utf8(bytes) {
            Ok(value) => Ok(value.to_string()),
            Err(_) => Err(corrupt_error!("invalid UTF-8 in length-prefixed string")),
        }
    }
}
