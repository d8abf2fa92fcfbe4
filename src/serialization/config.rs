//! Codec configuration for saving and loading records
//!
//! The configuration controls presentation of the text formats and bounds how much input
//! a single load may consume, so a corrupt length field or an unterminated text record
//! cannot make a reader allocate or scan without limit.

/// Configuration shared by every codec
///
/// Binary and portable records ignore `pretty`; JSON and XML records are indented when it
/// is set. The limit applies to every format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Indent JSON and XML output for human readers
    pub pretty: bool,

    /// Maximum number of bytes a single load may consume (default: 1 GiB)
    pub max_record_bytes: u64,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            max_record_bytes: 1 << 30,
        }
    }
}

impl CodecConfig {
    /// Creates a configuration producing the smallest output
    #[must_use]
    pub fn compact() -> Self {
        Self::default()
    }

    /// Creates a configuration producing indented JSON and XML
    #[must_use]
    pub fn human_readable() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }

    /// Returns a copy limited to records of at most `max_record_bytes`
    #[must_use]
    pub fn with_max_record_bytes(self, max_record_bytes: u64) -> Self {
        Self {
            max_record_bytes,
            ..self
        }
    }
}
