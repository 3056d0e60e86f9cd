//! Navigation-history blobs embedded in tab-state records.
//!
//! All generations share the same preamble (off-the-record flag, entry count,
//! current index). Generation 0 then writes every entry inline in the outer
//! pickle; generations 1 and 2 write each entry as a data field holding its
//! own nested pickle, so later generations can append per-entry fields.

use crate::services::pickle::{PickleReader, PickleWriter};
use crate::types::errors::{DecodeError, EncodeError};
use crate::types::tab_state::{ContentsState, Generation, NavigationEntry, NavigationHistory};

/// Smallest possible inline entry: five fields of four bytes each.
const MIN_ENTRY_SIZE: usize = 20;

/// Parses `buffer` with the layout of `version` and keeps the raw bytes.
pub fn decode(buffer: Vec<u8>, version: Generation) -> Result<ContentsState, DecodeError> {
    let history = read_history(&buffer, version)?;
    Ok(ContentsState {
        buffer,
        version,
        history,
    })
}

/// Serializes `history` with the layout of `version`.
///
/// Older generations have no room for the newer per-entry fields; those are
/// dropped when writing generation 0 or 1.
pub fn encode(history: NavigationHistory, version: Generation) -> Result<ContentsState, EncodeError> {
    let history = history.truncated_to(version);
    let buffer = write_history(&history, version)?;
    Ok(ContentsState {
        buffer,
        version,
        history,
    })
}

/// Rewrites `contents` in the latest generation's layout.
pub fn upgrade(contents: &ContentsState) -> Result<ContentsState, EncodeError> {
    if contents.version == Generation::LATEST {
        return Ok(contents.clone());
    }
    encode(contents.history.clone(), Generation::LATEST)
}

pub fn read_history(bytes: &[u8], version: Generation) -> Result<NavigationHistory, DecodeError> {
    let mut reader = PickleReader::new(bytes)?;
    let is_off_the_record = reader.read_bool("off-the-record flag")?;
    let count = reader.read_i32("entry count")?;
    let count = usize::try_from(count).map_err(|_| DecodeError::InvalidLength {
        field: "entry count",
        len: i64::from(count),
    })?;
    let current_index = reader.read_i32("current entry index")?;

    let mut entries = Vec::with_capacity(count.min(reader.remaining() / MIN_ENTRY_SIZE));
    for _ in 0..count {
        let entry = match version {
            Generation::V0 => read_entry(&mut reader, version)?,
            Generation::V1 | Generation::V2 => {
                let data = reader.read_bytes("navigation entry")?;
                let mut nested = PickleReader::new(data)?;
                read_entry(&mut nested, version)?
            }
        };
        entries.push(entry);
    }

    NavigationHistory::new(is_off_the_record, current_index, entries)
}

pub fn write_history(history: &NavigationHistory, version: Generation) -> Result<Vec<u8>, EncodeError> {
    let entries = history.entries();
    let count = i32::try_from(entries.len()).map_err(|_| EncodeError::TooLong {
        field: "entry count",
        len: entries.len(),
    })?;

    let mut writer = PickleWriter::new();
    writer.write_bool(history.is_off_the_record());
    writer.write_i32(count);
    writer.write_i32(history.current_index());

    for entry in entries {
        match version {
            Generation::V0 => write_entry(&mut writer, entry, version)?,
            Generation::V1 | Generation::V2 => {
                let mut nested = PickleWriter::new();
                write_entry(&mut nested, entry, version)?;
                writer.write_bytes("navigation entry", &nested.finish()?)?;
            }
        }
    }

    writer.finish()
}

fn read_entry(reader: &mut PickleReader<'_>, version: Generation) -> Result<NavigationEntry, DecodeError> {
    let mut entry = NavigationEntry {
        index: reader.read_i32("entry index")?,
        virtual_url: reader.read_string("virtual url")?,
        title: reader.read_string16("title")?,
        page_state: reader.read_bytes("page state")?.to_vec(),
        transition_type: reader.read_i32("transition type")?,
        ..NavigationEntry::default()
    };

    if version >= Generation::V1 {
        entry.has_post_data = reader.read_bool("post data flag")?;
        entry.referrer_url = reader.read_string("referrer url")?;
        entry.referrer_policy = reader.read_i32("referrer policy")?;
        entry.original_request_url = reader.read_string("original request url")?;
        entry.is_overriding_user_agent = reader.read_bool("user agent override flag")?;
    }

    if version >= Generation::V2 {
        entry.timestamp_micros = reader.read_i64("entry timestamp")?;
        entry.http_status_code = reader.read_i32("http status code")?;
    }

    Ok(entry)
}

fn write_entry(
    writer: &mut PickleWriter,
    entry: &NavigationEntry,
    version: Generation,
) -> Result<(), EncodeError> {
    writer.write_i32(entry.index);
    writer.write_string("virtual url", &entry.virtual_url)?;
    writer.write_string16("title", &entry.title)?;
    writer.write_bytes("page state", &entry.page_state)?;
    writer.write_i32(entry.transition_type);

    if version >= Generation::V1 {
        writer.write_bool(entry.has_post_data);
        writer.write_string("referrer url", &entry.referrer_url)?;
        writer.write_i32(entry.referrer_policy);
        writer.write_string("original request url", &entry.original_request_url)?;
        writer.write_bool(entry.is_overriding_user_agent);
    }

    if version >= Generation::V2 {
        writer.write_i64(entry.timestamp_micros);
        writer.write_i32(entry.http_status_code);
    }

    Ok(())
}
