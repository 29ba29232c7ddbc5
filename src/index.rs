//! Byte-offset frame index (`*.index.jsonl`)
//!
//! One JSON object per line, each locating one frame inside the log:
//!
//! ```text
//! {"offset": 0, "length": 812}
//! {"start": 812, "end": 1630}
//! {"offset": 1630, "len": 790, "step": 3}
//! ```
//!
//! The offset comes from `offset`, else `start`, else defaults to 0. The
//! length comes from `length`, else `len`, else `end - offset`. Parsing is
//! lenient: lines that are not JSON objects or lack a usable offset/length
//! are skipped and counted rather than failing the load.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Location of one frame's raw bytes in the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub length: u64,
}

/// Result of reading an index file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexLoad {
    /// Valid entries in file order; position `k - 1` is frame `k`
    pub entries: Vec<IndexEntry>,
    /// Non-blank lines that were dropped as malformed
    pub skipped: usize,
}

fn first_key<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

/// Parse one index record, returning `None` if it is unusable.
pub fn parse_record(line: &str) -> Option<IndexEntry> {
    let value: Value = serde_json::from_str(line).ok()?;
    let obj = value.as_object()?;

    let offset = match first_key(obj, &["offset", "start"]) {
        Some(v) => v.as_u64()?,
        None => 0,
    };

    let length = match first_key(obj, &["length", "len"]) {
        Some(v) => v.as_u64()?,
        None => {
            let end = obj.get("end")?.as_u64()?;
            end.checked_sub(offset)?
        }
    };

    Some(IndexEntry { offset, length })
}

/// Parse index records from a reader.
///
/// Invalid UTF-8 inside a line only affects that line.
pub fn parse_index<R: BufRead>(reader: R) -> io::Result<IndexLoad> {
    let mut load = IndexLoad::default();

    for (line_no, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(&line) {
            Some(entry) => load.entries.push(entry),
            None => {
                debug!(line = line_no + 1, "skipping malformed index record");
                load.skipped += 1;
            }
        }
    }

    Ok(load)
}

/// Read an index file from disk.
pub fn load_index(path: &Path) -> io::Result<IndexLoad> {
    let file = File::open(path)?;
    parse_index(BufReader::new(file))
}
