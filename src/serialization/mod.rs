//! Persistence of SDRs and generators in four interchangeable formats.
//!
//! Every persistable type converts itself to an [`Archive`], a small format-agnostic record,
//! and a table of codecs indexed by [`SerializableFormat`] turns archives into bytes and back.
//! Adding a format means adding a codec to the table; adding a persistable type means
//! implementing [`Serializable`].
//!
//! # Formats
//!
//! | code | format                               | encoding                          |
//! |------|--------------------------------------|-----------------------------------|
//! | 0    | [`SerializableFormat::Binary`]       | length-prefixed varint record     |
//! | 1    | [`SerializableFormat::Portable`]     | line-oriented ASCII text          |
//! | 2    | [`SerializableFormat::Json`]         | one JSON object                   |
//! | 3    | [`SerializableFormat::Xml`]          | one `<archive>` element           |
//!
//! Every record is self-delimiting, so several records can be written one after another to
//! the same stream and read back in the same order with the same format.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sdrscope::{Sdr, Serializable, SerializableFormat};
//!
//! let mut sdr = Sdr::new(&[3, 3])?;
//! sdr.set_sparse(&[1, 4, 8])?;
//!
//! let mut buffer = Vec::new();
//! sdr.save(&mut buffer, SerializableFormat::Json)?;
//! let restored = Sdr::load(&mut buffer.as_slice(), SerializableFormat::Json)?;
//! assert_eq!(sdr, restored);
//! # Ok::<(), sdrscope::Error>(())
//! ```

mod archive;
mod binary;
mod config;
mod json;
mod portable;
mod xml;

use std::{
    fs::File,
    io::{BufRead, BufWriter, Read, Write},
    path::Path,
};

use strum::{Display, EnumCount, EnumIter};

use crate::{file::Physical, Error, Result};

pub use archive::{Archive, Field};
pub use config::CodecConfig;

/// Version written into, and required from, every record.
pub const ARCHIVE_VERSION: u32 = 1;

/// The supported persistence formats.
///
/// The discriminants are the stable numeric codes accepted by
/// [`Serializable::save_with_code`] and [`Serializable::load_with_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum SerializableFormat {
    /// Compact little-endian binary record
    Binary = 0,
    /// Whitespace-separated ASCII text, stable across platforms
    Portable = 1,
    /// JSON object
    Json = 2,
    /// XML element
    Xml = 3,
}

impl SerializableFormat {
    /// Resolves a numeric format code.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for codes outside `0..=3`.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(SerializableFormat::Binary),
            1 => Ok(SerializableFormat::Portable),
            2 => Ok(SerializableFormat::Json),
            3 => Ok(SerializableFormat::Xml),
            other => Err(Error::Configuration(format!(
                "unknown serialization format code {other}"
            ))),
        }
    }

    /// Returns the numeric code of this format.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    fn codec(self) -> &'static Codec {
        &CODECS[self as usize]
    }
}

type EncodeFn = fn(&Archive, &mut dyn Write, &CodecConfig) -> Result<()>;
type DecodeFn = fn(&mut dyn BufRead, &CodecConfig) -> Result<Archive>;

struct Codec {
    encode: EncodeFn,
    decode: DecodeFn,
}

static CODECS: [Codec; SerializableFormat::COUNT] = [
    Codec {
        encode: binary::encode,
        decode: binary::decode,
    },
    Codec {
        encode: portable::encode,
        decode: portable::decode,
    },
    Codec {
        encode: json::encode,
        decode: json::decode,
    },
    Codec {
        encode: xml::encode,
        decode: xml::decode,
    },
];

/// A type that can be written to and restored from any [`SerializableFormat`].
///
/// Implementors only provide the conversion to and from an [`Archive`]; every stream and
/// file operation is derived from those two methods.
pub trait Serializable: Sized {
    /// Captures the complete state of `self`.
    ///
    /// # Errors
    /// Returns an error if the state cannot currently be read, for example
    /// [`Error::UseAfterFree`] for an orphaned view.
    fn to_archive(&self) -> Result<Archive>;

    /// Rebuilds a value from an archive.
    ///
    /// # Errors
    /// Returns [`Error::CorruptData`] if the archive is of the wrong kind or describes an
    /// invalid value.
    fn from_archive(archive: &Archive) -> Result<Self>;

    /// Writes one record to `writer` using the default [`CodecConfig`].
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the writer fails.
    fn save<W: Write>(&self, writer: &mut W, format: SerializableFormat) -> Result<()> {
        self.save_with_config(writer, format, &CodecConfig::default())
    }

    /// Writes one record to `writer`.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the writer fails.
    fn save_with_config<W: Write>(
        &self,
        writer: &mut W,
        format: SerializableFormat,
        config: &CodecConfig,
    ) -> Result<()> {
        let archive = self.to_archive()?;
        (format.codec().encode)(&archive, writer, config)?;
        log::debug!(
            "saved {} record with {} fields as {}",
            archive.kind(),
            archive.fields().len(),
            format
        );
        Ok(())
    }

    /// Writes one record selecting the format by numeric code.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for an unknown code, before anything is written.
    fn save_with_code<W: Write>(&self, writer: &mut W, code: u32) -> Result<()> {
        let format = SerializableFormat::from_code(code)?;
        self.save(writer, format)
    }

    /// Reads one record from `reader` using the default [`CodecConfig`].
    ///
    /// The reader is left positioned directly after the record.
    ///
    /// # Errors
    /// Returns [`Error::CorruptData`] for malformed or truncated input,
    /// [`Error::VersionMismatch`] for records of another version, and [`Error::Io`] if the
    /// reader fails.
    fn load<R: BufRead>(reader: &mut R, format: SerializableFormat) -> Result<Self> {
        Self::load_with_config(reader, format, &CodecConfig::default())
    }

    /// Reads one record from `reader`.
    ///
    /// At most [`CodecConfig::max_record_bytes`] are consumed.
    ///
    /// # Errors
    /// See [`Serializable::load`].
    fn load_with_config<R: BufRead>(
        reader: &mut R,
        format: SerializableFormat,
        config: &CodecConfig,
    ) -> Result<Self> {
        let mut limited = Read::take(&mut *reader, config.max_record_bytes);
        let archive = (format.codec().decode)(&mut limited, config)?;
        log::debug!(
            "loaded {} record with {} fields as {}",
            archive.kind(),
            archive.fields().len(),
            format
        );
        Self::from_archive(&archive)
    }

    /// Reads one record selecting the format by numeric code.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for an unknown code, before anything is read.
    fn load_with_code<R: BufRead>(reader: &mut R, code: u32) -> Result<Self> {
        let format = SerializableFormat::from_code(code)?;
        Self::load(reader, format)
    }

    /// Writes one record to a new file at `path`, replacing any existing file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be created or written.
    fn save_to_file(&self, path: impl AsRef<Path>, format: SerializableFormat) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer, format)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads the first record of the file at `path`.
    ///
    /// The file is memory-mapped and decoded in place.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be opened, otherwise see
    /// [`Serializable::load`].
    fn load_from_file(path: impl AsRef<Path>, format: SerializableFormat) -> Result<Self> {
        let physical = Physical::new(path)?;
        let mut data = physical.data();
        Self::load(&mut data, format)
    }
}

/// Maps a premature end of input to [`Error::CorruptData`], keeping other I/O failures.
pub(crate) fn read_failure(error: std::io::Error, what: &str) -> Error {
    match error.kind() {
        std::io::ErrorKind::UnexpectedEof => corrupt_error!("truncated {} record", what),
        std::io::ErrorKind::InvalidData => corrupt_error!("invalid {} record: {}", what, error),
        _ => Error::Io(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_format_codes() {
        for format in SerializableFormat::iter() {
            assert_eq!(
                SerializableFormat::from_code(format.code()).unwrap(),
                format
            );
        }
        assert_eq!(SerializableFormat::COUNT, 4);
        assert_eq!(SerializableFormat::Xml.code(), 3);
    }

    #[test]
    fn test_unknown_code() {
        assert!(matches!(
            SerializableFormat::from_code(4),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            SerializableFormat::from_code(u32::MAX),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_format_display() {
        assert_eq!(SerializableFormat::Binary.to_string(), "binary");
        assert_eq!(SerializableFormat::Portable.to_string(), "portable");
        assert_eq!(SerializableFormat::Json.to_string(), "json");
        assert_eq!(SerializableFormat::Xml.to_string(), "xml");
    }

    #[test]
    fn test_every_codec_round_trips_an_archive() {
        let archive = Archive::new("Sample")
            .with_scalar("answer", 42)
            .with_scalar("large", u64::MAX)
            .with_list("empty", Vec::new())
            .with_list("values", [0, 1, 127, 128, 1 << 40]);

        for format in SerializableFormat::iter() {
            for config in [CodecConfig::compact(), CodecConfig::human_readable()] {
                let mut buffer = Vec::new();
                (format.codec().encode)(&archive, &mut buffer, &config).unwrap();
                let mut reader = buffer.as_slice();
                let decoded = (format.codec().decode)(&mut reader, &config).unwrap();
                assert_eq!(decoded, archive, "format {format}");
            }
        }
    }

    #[test]
    fn test_every_codec_rejects_empty_input() {
        for format in SerializableFormat::iter() {
            let mut reader: &[u8] = &[];
            let result = (format.codec().decode)(&mut reader, &CodecConfig::default());
            assert!(
                matches!(result, Err(Error::CorruptData { .. })),
                "format {format}: {result:?}"
            );
        }
    }
}
