//! XML records.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <archive format="sdrscope/xml" version="1" kind="SDR">
//!   <list name="dimensions" count="2">3 3</list>
//!   <list name="sparse" count="3">1 4 8</list>
//! </archive>
//! ```
//!
//! Scalars are `<scalar name="..">value</scalar>` elements. The reader stops at the closing
//! `</archive>` tag, so several records can follow one another in a stream.

use std::{
    borrow::Cow,
    io::{BufRead, Write},
};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::{
    serialization::{Archive, CodecConfig, Field, ARCHIVE_VERSION},
    Error, Result,
};

const FORMAT_TAG: &str = "sdrscope/xml";

const ROOT: &[u8] = b"archive";
const SCALAR: &[u8] = b"scalar";
const LIST: &[u8] = b"list";

pub(crate) fn encode(
    archive: &Archive,
    writer: &mut dyn Write,
    config: &CodecConfig,
) -> Result<()> {
    {
        let mut xml = if config.pretty {
            Writer::new_with_indent(&mut *writer, b' ', 2)
        } else {
            Writer::new(&mut *writer)
        };

        let version = ARCHIVE_VERSION.to_string();
        write_event(
            &mut xml,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write_event(
            &mut xml,
            Event::Start(BytesStart::new("archive").with_attributes([
                ("format", FORMAT_TAG),
                ("version", version.as_str()),
                ("kind", archive.kind()),
            ])),
        )?;

        for (name, field) in archive.fields() {
            match field {
                Field::Scalar(value) => {
                    write_event(
                        &mut xml,
                        Event::Start(
                            BytesStart::new("scalar").with_attributes([("name", name.as_str())]),
                        ),
                    )?;
                    write_event(&mut xml, Event::Text(BytesText::new(&value.to_string())))?;
                    write_event(&mut xml, Event::End(BytesEnd::new("scalar")))?;
                }
                Field::List(values) => {
                    let count = values.len().to_string();
                    write_event(
                        &mut xml,
                        Event::Start(BytesStart::new("list").with_attributes([
                            ("name", name.as_str()),
                            ("count", count.as_str()),
                        ])),
                    )?;
                    if !values.is_empty() {
                        let text = values
                            .iter()
                            .map(u64::to_string)
                            .collect::<Vec<_>>()
                            .join(" ");
                        write_event(&mut xml, Event::Text(BytesText::new(&text)))?;
                    }
                    write_event(&mut xml, Event::End(BytesEnd::new("list")))?;
                }
            }
        }

        write_event(&mut xml, Event::End(BytesEnd::new("archive")))?;
    }

    writer.write_all(b"\n")?;
    Ok(())
}

fn write_event<W: Write>(xml: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    xml.write_event(event)
        .map_err(|error| Error::Io(std::io::Error::other(error.to_string())))
}

/// A field element whose text has not been closed yet.
struct Pending {
    name: String,
    count: Option<u64>,
    text: String,
}

pub(crate) fn decode(reader: &mut dyn BufRead, _config: &CodecConfig) -> Result<Archive> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buffer = Vec::new();
    let mut archive: Option<Archive> = None;
    let mut pending: Option<Pending> = None;

    loop {
        match xml.read_event_into(&mut buffer).map_err(xml_failure)? {
            Event::Start(element) => match element.name().as_ref() {
                ROOT if archive.is_none() => archive = Some(open_archive(&element)?),
                SCALAR | LIST if archive.is_some() && pending.is_none() => {
                    pending = Some(open_field(&element)?);
                }
                other => return Err(unexpected(other)),
            },
            Event::Empty(element) => match element.name().as_ref() {
                ROOT if archive.is_none() => return open_archive(&element),
                SCALAR | LIST if pending.is_none() => {
                    let target = archive.as_mut().ok_or_else(|| unexpected(LIST))?;
                    close_field(target, open_field(&element)?)?;
                }
                other => return Err(unexpected(other)),
            },
            Event::Text(text) => {
                let field = pending
                    .as_mut()
                    .ok_or_else(|| corrupt_error!("text outside of a field element"))?;
                let text: Cow<'_, str> = text
                    .unescape()
                    .map_err(|error| corrupt_error!("malformed XML text: {}", error))?;
                field.text.push_str(&text);
            }
            Event::End(element) => match element.name().as_ref() {
                SCALAR | LIST => {
                    let field = pending
                        .take()
                        .ok_or_else(|| unexpected(element.name().as_ref()))?;
                    let target = archive.as_mut().ok_or_else(|| unexpected(ROOT))?;
                    close_field(target, field)?;
                }
                ROOT if pending.is_none() => {
                    return archive.ok_or_else(|| unexpected(ROOT));
                }
                other => return Err(unexpected(other)),
            },
            Event::Eof => return Err(corrupt_error!("truncated XML record")),
            Event::CData(_) => return Err(corrupt_error!("CDATA is not allowed in XML records")),
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buffer.clear();
    }
}

fn open_archive(element: &BytesStart<'_>) -> Result<Archive> {
    if attribute(element, "format")? != FORMAT_TAG {
        return Err(corrupt_error!("XML element is not a {} record", FORMAT_TAG));
    }
    let version = attribute(element, "version")?;
    let version = version
        .trim()
        .parse::<u32>()
        .map_err(|_| corrupt_error!("invalid XML record version '{}'", version))?;
    if version != ARCHIVE_VERSION {
        return Err(Error::VersionMismatch {
            found: version,
            supported: ARCHIVE_VERSION,
        });
    }

    let kind = attribute(element, "kind")?;
    if !super::archive::is_valid_name(&kind) {
        return Err(corrupt_error!("invalid record kind '{}'", kind));
    }
    Ok(Archive::new(kind))
}

fn open_field(element: &BytesStart<'_>) -> Result<Pending> {
    let name = attribute(element, "name")?;
    let count = if element.name().as_ref() == LIST {
        let count = attribute(element, "count")?;
        Some(
            count
                .trim()
                .parse::<u64>()
                .map_err(|_| corrupt_error!("invalid count '{}' for '{}'", count, name))?,
        )
    } else {
        None
    };

    Ok(Pending {
        name,
        count,
        text: String::new(),
    })
}

fn close_field(archive: &mut Archive, pending: Pending) -> Result<()> {
    let parse = |token: &str| {
        token
            .parse::<u64>()
            .map_err(|_| corrupt_error!("invalid number '{}' for '{}'", token, pending.name))
    };

    let field = match pending.count {
        None => Field::Scalar(parse(pending.text.trim())?),
        Some(count) => {
            let values = pending
                .text
                .split_whitespace()
                .map(parse)
                .collect::<Result<Vec<u64>>>()?;
            if values.len() as u64 != count {
                return Err(corrupt_error!(
                    "list '{}' declares {} values but holds {}",
                    pending.name,
                    count,
                    values.len()
                ));
            }
            Field::List(values)
        }
    };
    archive.insert(pending.name, field)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<String> {
    let value = element
        .try_get_attribute(name)
        .map_err(|error| corrupt_error!("malformed XML attribute: {}", error))?
        .ok_or_else(|| corrupt_error!("missing XML attribute '{}'", name))?;
    let value = value
        .unescape_value()
        .map_err(|error| corrupt_error!("malformed XML attribute '{}': {}", name, error))?;
    Ok(value.into_owned())
}

fn unexpected(name: &[u8]) -> Error {
    corrupt_error!("unexpected XML element <{}>", String::from_utf8_lossy(name))
}

fn xml_failure(error: quick_xml::Error) -> Error {
    match error {
        quick_xml::Error::Io(error) => {
            Error::Io(std::io::Error::new(error.kind(), error.to_string()))
        }
        other => corrupt_error!("malformed XML record: {}", other),
    }
}
