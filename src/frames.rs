//! Random access to the frames of a log
//!
//! A [`FrameStore`] is built once per log and is read-only afterwards. It
//! works in one of two modes:
//!
//! - **Indexed**: a companion index lists the byte range of every frame;
//!   each [`FrameStore::get`] is one seek plus one bounded read.
//! - **Split**: the whole log is read and cut at every step header line
//!   (see [`crate::header`]); frames are kept in memory.

use crate::header::is_step_header;
use crate::index::{load_index, IndexEntry};
use serde::Serialize;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for frame store operations
#[derive(Debug, Error)]
pub enum FrameError {
    /// The log file does not exist
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Reading the log or index failed
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Neither a usable index nor any step header was found
    #[error("no frames detected in '{}'", .0.display())]
    NoFrames(PathBuf),
    /// Requested frame number outside `1..=len`
    #[error("frame index {index} out of range 1..{len}")]
    OutOfRange { index: usize, len: usize },
}

impl FrameError {
    fn io(path: &Path, source: io::Error) -> Self {
        FrameError::Io { path: path.to_path_buf(), source }
    }
}

/// Which frame addressing strategy a store uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Indexed,
    Split,
}

#[derive(Debug)]
enum Frames {
    Indexed { log: PathBuf, entries: Vec<IndexEntry> },
    Split { frames: Vec<String> },
}

/// Ordered, 1-based collection of frames over one log.
#[derive(Debug)]
pub struct FrameStore {
    frames: Frames,
    skipped_index_lines: usize,
}

impl FrameStore {
    /// Open a log, preferring the byte-offset index when it has usable records.
    ///
    /// A missing index file is not an error; the store falls back to header
    /// splitting. Fails with [`FrameError::NotFound`] if the log is missing
    /// and [`FrameError::NoFrames`] if no frame can be derived.
    pub fn open(log: &Path, index: Option<&Path>) -> Result<Self, FrameError> {
        if !log.is_file() {
            return Err(FrameError::NotFound(log.to_path_buf()));
        }

        let mut skipped_index_lines = 0;
        if let Some(index) = index.filter(|p| p.is_file()) {
            let load = load_index(index).map_err(|e| FrameError::io(index, e))?;
            skipped_index_lines = load.skipped;
            if load.skipped > 0 {
                warn!(
                    index = %index.display(),
                    skipped = load.skipped,
                    "ignored malformed index records"
                );
            }
            if !load.entries.is_empty() {
                info!(frames = load.entries.len(), index = %index.display(), "using byte-offset index");
                return Ok(Self {
                    frames: Frames::Indexed { log: log.to_path_buf(), entries: load.entries },
                    skipped_index_lines,
                });
            }
            warn!(index = %index.display(), "index has no usable records, splitting by headers");
        }

        let bytes = fs::read(log).map_err(|e| FrameError::io(log, e))?;
        let frames = split_frames(&String::from_utf8_lossy(&bytes));
        if frames.is_empty() {
            return Err(FrameError::NoFrames(log.to_path_buf()));
        }
        info!(frames = frames.len(), log = %log.display(), "split log by step headers");

        Ok(Self { frames: Frames::Split { frames }, skipped_index_lines })
    }

    /// Build an indexed store from already-parsed entries.
    pub fn from_entries(log: impl Into<PathBuf>, entries: Vec<IndexEntry>) -> Self {
        Self {
            frames: Frames::Indexed { log: log.into(), entries },
            skipped_index_lines: 0,
        }
    }

    /// Build a split-mode store from log text.
    pub fn from_text(text: &str) -> Self {
        Self {
            frames: Frames::Split { frames: split_frames(text) },
            skipped_index_lines: 0,
        }
    }

    pub fn mode(&self) -> StoreMode {
        match self.frames {
            Frames::Indexed { .. } => StoreMode::Indexed,
            Frames::Split { .. } => StoreMode::Split,
        }
    }

    /// Number of malformed index records ignored while opening.
    pub fn skipped_index_lines(&self) -> usize {
        self.skipped_index_lines
    }

    pub fn len(&self) -> usize {
        match &self.frames {
            Frames::Indexed { entries, .. } => entries.len(),
            Frames::Split { frames } => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw text of frame `k` (1-based).
    ///
    /// In indexed mode bytes that are not valid UTF-8 are replaced with
    /// U+FFFD, and a range running past the end of the file yields whatever
    /// bytes are present.
    pub fn get(&self, k: usize) -> Result<Cow<'_, str>, FrameError> {
        let len = self.len();
        if k == 0 || k > len {
            return Err(FrameError::OutOfRange { index: k, len });
        }
        match &self.frames {
            Frames::Split { frames } => Ok(Cow::Borrowed(frames[k - 1].as_str())),
            Frames::Indexed { log, entries } => read_range(log, entries[k - 1]).map(Cow::Owned),
        }
    }

    /// Iterate over every frame in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Cow<'_, str>, FrameError>> + '_ {
        (1..=self.len()).map(move |k| self.get(k))
    }
}

fn read_range(log: &Path, entry: IndexEntry) -> Result<String, FrameError> {
    let mut file = File::open(log).map_err(|e| FrameError::io(log, e))?;
    file.seek(SeekFrom::Start(entry.offset)).map_err(|e| FrameError::io(log, e))?;

    let mut buf = Vec::new();
    file.take(entry.length).read_to_end(&mut buf).map_err(|e| FrameError::io(log, e))?;
    if (buf.len() as u64) < entry.length {
        debug!(offset = entry.offset, length = entry.length, read = buf.len(), "short frame read");
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Cut log text into frames at every step header line.
///
/// Each frame runs from its header up to the line before the next header
/// (or the end of the text), with trailing whitespace removed. Text before
/// the first header is not part of any frame.
pub fn split_frames(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let starts: Vec<usize> =
        lines.iter().enumerate().filter(|(_, l)| is_step_header(l)).map(|(i, _)| i).collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            lines[start..end].join("\n").trim_end().to_string()
        })
        .collect()
}
