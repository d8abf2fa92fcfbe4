//! Byte-level input and output.
//!
//! - [`io`] - little-endian and 7-bit varint encoding helpers
//! - [`parser`] - [`Parser`], a bounds-checked cursor over a byte slice
//! - [`physical`] - [`Physical`], a read-only memory mapping of a file

pub mod io;
pub mod parser;
pub mod physical;

pub use parser::Parser;
pub use physical::Physical;
