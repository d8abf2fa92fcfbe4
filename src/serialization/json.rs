//! JSON records.
//!
//! ```json
//! {"format":"sdrscope/json","version":1,"kind":"SDR","fields":{"dimensions":[3,3],"sparse":[1,4,8]}}
//! ```
//!
//! Scalars are JSON numbers and lists are JSON arrays. Each record is followed by a newline;
//! the reader consumes exactly one object and leaves whatever follows it in the stream.

use std::{
    collections::BTreeMap,
    io::{BufRead, Write},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    serialization::{Archive, CodecConfig, Field, ARCHIVE_VERSION},
    Error, Result,
};

const FORMAT_TAG: &str = "sdrscope/json";

#[derive(Serialize)]
struct RecordRef<'a> {
    format: &'static str,
    version: u32,
    kind: &'a str,
    fields: &'a BTreeMap<String, Field>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Record {
    #[allow(dead_code)]
    format: String,
    #[allow(dead_code)]
    version: u32,
    kind: String,
    fields: BTreeMap<String, Field>,
}

pub(crate) fn encode(
    archive: &Archive,
    writer: &mut dyn Write,
    config: &CodecConfig,
) -> Result<()> {
    let record = RecordRef {
        format: FORMAT_TAG,
        version: ARCHIVE_VERSION,
        kind: archive.kind(),
        fields: archive.fields(),
    };

    if config.pretty {
        serde_json::to_writer_pretty(&mut *writer, &record).map_err(json_failure)?;
    } else {
        serde_json::to_writer(&mut *writer, &record).map_err(json_failure)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

pub(crate) fn decode(reader: &mut dyn BufRead, _config: &CodecConfig) -> Result<Archive> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let value = Value::deserialize(&mut deserializer).map_err(json_failure)?;

    match value.get("format").and_then(Value::as_str) {
        Some(FORMAT_TAG) => {}
        _ => return Err(corrupt_error!("JSON value is not a {} record", FORMAT_TAG)),
    }
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| corrupt_error!("JSON record has no version"))?;
    if version != u64::from(ARCHIVE_VERSION) {
        return Err(Error::VersionMismatch {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            supported: ARCHIVE_VERSION,
        });
    }

    let record = Record::deserialize(value).map_err(json_failure)?;
    if !super::archive::is_valid_name(&record.kind) {
        return Err(corrupt_error!("invalid record kind '{}'", record.kind));
    }

    let mut archive = Archive::new(record.kind);
    for (name, field) in record.fields {
        archive.insert(name, field)?;
    }
    Ok(archive)
}

fn json_failure(error: serde_json::Error) -> Error {
    if error.is_io() {
        Error::Io(error.into())
    } else if error.is_eof() {
        corrupt_error!("truncated JSON record")
    } else {
        corrupt_error!("malformed JSON record: {}", error)
    }
}
