//! Line-oriented ASCII records.
//!
//! ```text
//! sdrscope-portable 1 SDR
//! dimensions l 2 3 3
//! sparse l 3 1 4 8
//! end
//! ```
//!
//! The first line carries the magic, the record version and the kind. Each following line
//! is one field: its name, `s` and the value for a scalar, or `l`, the element count and the
//! elements for a list. The record ends with a line reading `end`. Every number is decimal,
//! so records are identical on every platform.

use std::io::{BufRead, Write};

use crate::{
    serialization::{read_failure, Archive, CodecConfig, Field, ARCHIVE_VERSION},
    Error, Result,
};

const MAGIC: &str = "sdrscope-portable";
const TERMINATOR: &str = "end";

pub(crate) fn encode(
    archive: &Archive,
    writer: &mut dyn Write,
    _config: &CodecConfig,
) -> Result<()> {
    let mut text = format!("{MAGIC} {ARCHIVE_VERSION} {}\n", archive.kind());
    for (name, field) in archive.fields() {
        text.push_str(name);
        match field {
            Field::Scalar(value) => {
                text.push_str(" s ");
                text.push_str(&value.to_string());
            }
            Field::List(values) => {
                text.push_str(" l ");
                text.push_str(&values.len().to_string());
                for value in values {
                    text.push(' ');
                    text.push_str(&value.to_string());
                }
            }
        }
        text.push('\n');
    }
    text.push_str(TERMINATOR);
    text.push('\n');

    writer.write_all(text.as_bytes())?;
    Ok(())
}

pub(crate) fn decode(reader: &mut dyn BufRead, _config: &CodecConfig) -> Result<Archive> {
    let mut line = String::new();

    let header = loop {
        if !next_line(reader, &mut line)? {
            return Err(corrupt_error!("truncated portable record"));
        }
        if !line.trim().is_empty() {
            break line.trim().to_string();
        }
    };

    let mut tokens = header.split_whitespace();
    if tokens.next() != Some(MAGIC) {
        return Err(corrupt_error!(
            "portable record does not start with {}",
            MAGIC
        ));
    }
    let version = parse_number(tokens.next(), "record version")?;
    let version = u32::try_from(version)
        .map_err(|_| corrupt_error!("record version {} out of range", version))?;
    if version != ARCHIVE_VERSION {
        return Err(Error::VersionMismatch {
            found: version,
            supported: ARCHIVE_VERSION,
        });
    }
    let kind = tokens
        .next()
        .ok_or_else(|| corrupt_error!("portable record header has no kind"))?;
    if !super::archive::is_valid_name(kind) || tokens.next().is_some() {
        return Err(corrupt_error!("malformed portable record header"));
    }

    let mut archive = Archive::new(kind);
    loop {
        if !next_line(reader, &mut line)? {
            return Err(corrupt_error!("portable record has no terminator"));
        }
        let content = line.trim();
        if content == TERMINATOR {
            return Ok(archive);
        }

        let mut tokens = content.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| corrupt_error!("empty line inside portable record"))?;
        let field = match tokens.next() {
            Some("s") => Field::Scalar(parse_number(tokens.next(), name)?),
            Some("l") => {
                let count = parse_number(tokens.next(), name)?;
                let values = tokens
                    .by_ref()
                    .map(|token| parse_number(Some(token), name))
                    .collect::<Result<Vec<u64>>>()?;
                if values.len() as u64 != count {
                    return Err(corrupt_error!(
                        "list '{}' declares {} values but holds {}",
                        name,
                        count,
                        values.len()
                    ));
                }
                Field::List(values)
            }
            other => {
                return Err(corrupt_error!(
                    "unknown field type {:?} for '{}'",
                    other,
                    name
                ))
            }
        };
        if tokens.next().is_some() {
            return Err(corrupt_error!("unexpected trailing data after '{}'", name));
        }
        archive.insert(name.to_string(), field)?;
    }
}

/// Reads the next line into `line`, returning `false` at end of input.
fn next_line(reader: &mut dyn BufRead, line: &mut String) -> Result<bool> {
    line.clear();
    match reader.read_line(line) {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(error) => Err(read_failure(error, "portable")),
    }
}

fn parse_number(token: Option<&str>, what: &str) -> Result<u64> {
    let token = token.ok_or_else(|| corrupt_error!("missing value for '{}'", what))?;
    token
        .parse::<u64>()
        .map_err(|_| corrupt_error!("invalid number '{}' for '{}'", token, what))
}
