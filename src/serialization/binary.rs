//! Compact binary records.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "SDRB"
//! 4       2     record version, u16 little-endian
//! 6       4     payload length in bytes, u32 little-endian
//! 10      n     payload
//! ```
//!
//! The payload is the kind as a length-prefixed UTF-8 string, a 7-bit encoded field count,
//! then per field its name, a tag byte (`0` scalar, `1` list) and the value: one 7-bit
//! encoded integer for a scalar, or a 7-bit encoded count followed by that many 7-bit encoded
//! integers for a list. The length prefix lets a reader consume exactly one record.

use std::io::{BufRead, Read, Write};

use crate::{
    file::{
        io::{write_7bit_encoded, write_le, write_prefixed_string_utf8},
        Parser,
    },
    serialization::{read_failure, Archive, CodecConfig, Field, ARCHIVE_VERSION},
    Error, Result,
};

const MAGIC: &[u8; 4] = b"SDRB";
const HEADER_SIZE: usize = 10;

const TAG_SCALAR: u8 = 0;
const TAG_LIST: u8 = 1;

pub(crate) fn encode(
    archive: &Archive,
    writer: &mut dyn Write,
    _config: &CodecConfig,
) -> Result<()> {
    let mut payload = Vec::new();
    write_prefixed_string_utf8(&mut payload, archive.kind());
    write_7bit_encoded(&mut payload, archive.fields().len() as u64);
    for (name, field) in archive.fields() {
        write_prefixed_string_utf8(&mut payload, name);
        match field {
            Field::Scalar(value) => {
                payload.push(TAG_SCALAR);
                write_7bit_encoded(&mut payload, *value);
            }
            Field::List(values) => {
                payload.push(TAG_LIST);
                write_7bit_encoded(&mut payload, values.len() as u64);
                for &value in values {
                    write_7bit_encoded(&mut payload, value);
                }
            }
        }
    }

    let length = u32::try_from(payload.len()).map_err(|_| {
        Error::InvalidValue(format!(
            "binary record payload of {} bytes exceeds the format limit",
            payload.len()
        ))
    })?;
    let version = u16::try_from(ARCHIVE_VERSION)
        .map_err(|_| Error::InvalidValue("record version exceeds u16".to_string()))?;

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(MAGIC);
    write_le(&mut header, version);
    write_le(&mut header, length);

    writer.write_all(&header)?;
    writer.write_all(&payload)?;
    Ok(())
}

pub(crate) fn decode(reader: &mut dyn BufRead, config: &CodecConfig) -> Result<Archive> {
    let mut header = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .map_err(|error| read_failure(error, "binary"))?;

    let mut parser = Parser::new(&header);
    if parser.read_bytes(MAGIC.len())? != MAGIC {
        return Err(corrupt_error!("binary record does not start with SDRB"));
    }
    let version = u32::from(parser.read_le::<u16>()?);
    if version != ARCHIVE_VERSION {
        return Err(Error::VersionMismatch {
            found: version,
            supported: ARCHIVE_VERSION,
        });
    }
    let length = parser.read_le::<u32>()?;
    if u64::from(length) > config.max_record_bytes {
        return Err(corrupt_error!(
            "binary record payload of {} bytes exceeds the limit of {}",
            length,
            config.max_record_bytes
        ));
    }

    // Grow the buffer as bytes arrive so a lying header cannot force a large allocation.
    let mut payload = Vec::new();
    Read::take(&mut *reader, u64::from(length))
        .read_to_end(&mut payload)
        .map_err(|error| read_failure(error, "binary"))?;
    if payload.len() != length as usize {
        return Err(corrupt_error!(
            "truncated binary record: {} of {} payload bytes",
            payload.len(),
            length
        ));
    }

    parse_payload(&payload).map_err(|error| match error {
        Error::OutOfBounds => corrupt_error!("binary record payload ends early"),
        other => other,
    })
}

fn parse_payload(payload: &[u8]) -> Result<Archive> {
    let mut parser = Parser::new(payload);
    let kind = parser.read_prefixed_string_utf8()?;
    if !super::archive::is_valid_name(&kind) {
        return Err(corrupt_error!("invalid record kind '{}'", kind));
    }

    let mut archive = Archive::new(kind);
    let field_count = parser.read_count()?;
    for _ in 0..field_count {
        let name = parser.read_prefixed_string_utf8()?;
        let field = match parser.read_le::<u8>()? {
            TAG_SCALAR => Field::Scalar(parser.read_7bit_encoded()?),
            TAG_LIST => {
                let count = parser.read_count()?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(parser.read_7bit_encoded()?);
                }
                Field::List(values)
            }
            tag => return Err(corrupt_error!("unknown field tag {} for '{}'", tag, name)),
        };
        archive.insert(name, field)?;
    }

    if parser.has_more_data() {
        return Err(corrupt_error!(
            "{} unused bytes after the last field",
            parser.remaining()
        ));
    }
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let archive = Archive::new("SDR")
            .with_list("dimensions", [3, 3])
            .with_list("sparse", [1, 4, 8]);
        let mut buffer = Vec::new();
        encode(&archive, &mut buffer, &CodecConfig::default()).unwrap();
        buffer
    }

    #[test]
    fn test_layout() {
        let buffer = sample();
        assert_eq!(&buffer[..4], b"SDRB");
        assert_eq!(&buffer[4..6], &[1, 0]);
        let length = u32::from_le_bytes([buffer[6], buffer[7], buffer[8], buffer[9]]);
        assert_eq!(length as usize, buffer.len() - HEADER_SIZE);
        // kind "SDR"
        assert_eq!(&buffer[10..14], &[3, b'S', b'D', b'R']);
    }

    #[test]
    fn test_reader_stops_after_record() {
        let mut stream = sample();
        stream.extend_from_slice(b"trailing");
        let mut reader = stream.as_slice();
        decode(&mut reader, &CodecConfig::default()).unwrap();
        assert_eq!(reader, b"trailing");
    }

    #[test]
    fn test_bad_magic() {
        let mut buffer = sample();
        buffer[0] = b'X';
        let result = decode(&mut buffer.as_slice(), &CodecConfig::default());
        assert!(matches!(result, Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_version_mismatch() {
        let mut buffer = sample();
        buffer[4] = 9;
        let result = decode(&mut buffer.as_slice(), &CodecConfig::default());
        assert!(matches!(
            result,
            Err(Error::VersionMismatch {
                found: 9,
                supported: 1
            })
        ));
    }

    #[test]
    fn test_truncated() {
        let buffer = sample();
        for cut in [3, HEADER_SIZE, buffer.len() - 1] {
            let result = decode(&mut &buffer[..cut], &CodecConfig::default());
            assert!(
                matches!(result, Err(Error::CorruptData { .. })),
                "cut at {cut}: {result:?}"
            );
        }
    }

    #[test]
    fn test_payload_limit() {
        let buffer = sample();
        let config = CodecConfig::default().with_max_record_bytes(4);
        let result = decode(&mut buffer.as_slice(), &config);
        assert!(matches!(result, Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_unknown_tag() {
        let mut buffer = sample();
        // kind(4) + count(1) + name "dimensions"(11) puts the first tag at payload offset 16
        buffer[HEADER_SIZE + 16] = 7;
        let result = decode(&mut buffer.as_slice(), &CodecConfig::default());
        assert!(matches!(result, Err(Error::CorruptData { .. })));
    }
}
