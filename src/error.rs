use thiserror::Error;

macro_rules! corrupt_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::CorruptData {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::CorruptData {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into three groups. Argument errors are raised by the mutating and querying
/// operations of an [`crate::Sdr`] before any state is touched, so a failed call never leaves a
/// node partially updated. Lifetime errors are raised by reshape views. Persistence errors are
/// raised by the [`crate::serialization`] layer, which keeps I/O failures ([`Error::Io`]) apart
/// from payload failures so a caller can decide whether to retry the I/O or reject the data.
///
/// # Error Categories
///
/// ## Argument Errors
/// - [`Error::InvalidLength`] - Wrong-size dense buffer or mismatched coordinate lists
/// - [`Error::IndexOutOfRange`] - Index beyond a dimension bound or the total size
/// - [`Error::InvalidOrder`] - Sparse indices not strictly ascending
/// - [`Error::InvalidValue`] - Dense entry outside {0,1}, fraction outside [0,1], bad dimensions
/// - [`Error::DimensionMismatch`] - Size mismatch between two nodes or a reshape and its parent
///
/// ## View Errors
/// - [`Error::UnsupportedOperation`] - Mutation attempted on a reshape view
/// - [`Error::UseAfterFree`] - Operation on a view whose parent has been destroyed
///
/// ## Persistence Errors
/// - [`Error::Configuration`] - Unknown serialization format code
/// - [`Error::CorruptData`] - Payload could not be parsed under its declared format
/// - [`Error::VersionMismatch`] - Record carries an unknown version marker
/// - [`Error::OutOfBounds`] - Byte-level read past the end of a buffer
/// - [`Error::Io`] - Underlying reader or writer failed
///
/// # Examples
///
/// ```rust
/// use sdrscope::{Error, Sdr};
///
/// let parent = Sdr::new(&[11])?;
/// match Sdr::reshape(&parent, &[2, 5]) {
///     Err(Error::DimensionMismatch { expected, actual }) => {
///         assert_eq!((expected, actual), (11, 10));
///     }
///     other => panic!("unexpected result: {other:?}"),
/// }
/// # Ok::<(), sdrscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A buffer or list had the wrong length.
    ///
    /// Raised for dense buffers whose length differs from the node size, for
    /// coordinate inputs with the wrong number of dimension lists or lists of
    /// unequal length, and for coordinate lookups with the wrong rank.
    #[error("Invalid length - expected {expected}, got {actual}")]
    InvalidLength {
        /// The length the operation required
        expected: usize,
        /// The length that was supplied
        actual: usize,
    },

    /// An index was outside of its valid range.
    #[error("Index {index} is out of range for bound {bound}")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// The exclusive upper bound the index had to respect
        bound: usize,
    },

    /// Sparse indices were not strictly ascending.
    ///
    /// The associated value is the position within the input at which the
    /// ordering was first violated (a duplicate counts as a violation).
    #[error("Sparse indices must be strictly ascending - violated at position {0}")]
    InvalidOrder(usize),

    /// A value was outside of its permitted domain.
    #[error("Invalid value - {0}")]
    InvalidValue(String),

    /// Two sizes that had to agree did not.
    ///
    /// Raised when a reshape's dimensions do not multiply to its parent's
    /// size, and when binary operations combine nodes of different sizes.
    #[error("Dimension mismatch - expected size {expected}, got {actual}")]
    DimensionMismatch {
        /// The size required by the receiving node
        expected: usize,
        /// The size that was supplied
        actual: usize,
    },

    /// The operation is not supported on this node.
    ///
    /// Reshape views are read-only, every mutation has to target the canonical
    /// node at the root of the view tree.
    #[error("Unsupported operation - {0}")]
    UnsupportedOperation(&'static str),

    /// The view's parent has been destroyed.
    ///
    /// Once a parent goes away all views below it are orphaned permanently.
    /// They remain valid objects but reject every further read.
    #[error("The parent of this view has been destroyed")]
    UseAfterFree,

    /// The serialization configuration is invalid.
    ///
    /// Raised before any I/O is attempted, e.g. for an unknown format code.
    #[error("Configuration error - {0}")]
    Configuration(String),

    /// The payload is damaged and could not be parsed.
    ///
    /// The error includes the source location where the corruption was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was corrupt
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Corrupt data - {file}:{line}: {message}")]
    CorruptData {
        /// The message to be printed for the CorruptData error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The record carries a version marker this library does not understand.
    #[error("Unsupported record version {found}, this library reads version {supported}")]
    VersionMismatch {
        /// The version found in the record
        found: u32,
        /// The version this library writes and reads
        supported: u32,
    },

    /// An out of bound access was attempted while decoding a byte buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// I/O error.
    ///
    /// Wraps standard I/O errors raised by the reader or writer handed to the
    /// serialization layer, or by the filesystem.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error came from the underlying reader or writer
    /// rather than from the data itself.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
