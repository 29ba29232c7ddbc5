//! Frame header recognition
//!
//! A frame starts at a step header line. Two shapes are recognized:
//!
//! - [`HeaderKind::BurningCells`]: `Step 3: Burning cells = 12`
//! - [`HeaderKind::Burning`]: `Step 3: Burning=12, Extinguished=4, Natural Burnouts=1`
//!
//! Matching is ASCII case-insensitive and runs on the line with all control
//! sequences removed, so a bold step number (`ESC[1mStep 3ESC[0m:`) is
//! accepted.

use crate::ansi::strip_codes;

/// Which header shape matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// `Step k: Burning cells = N`
    BurningCells,
    /// `Step k: Burning = N, ...`
    Burning,
}

/// A recognized step header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepHeader {
    pub step: u64,
    pub kind: HeaderKind,
    /// Active-unit count carried by the header
    pub active: u64,
}

/// Forward-only scanner over ASCII-ish text.
pub(crate) struct TextCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TextCursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { bytes: text.as_bytes(), pos: 0 }
    }

    /// Skip ASCII whitespace, returning how many bytes were skipped.
    pub(crate) fn skip_ws(&mut self) -> usize {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Consume `word` (ASCII case-insensitive) if it is next.
    pub(crate) fn keyword(&mut self, word: &str) -> bool {
        let end = self.pos + word.len();
        match self.bytes.get(self.pos..end) {
            Some(slice) if slice.eq_ignore_ascii_case(word.as_bytes()) => {
                self.pos = end;
                true
            }
            _ => false,
        }
    }

    /// Consume a single byte if it is next.
    pub(crate) fn punct(&mut self, byte: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a run of decimal digits.
    ///
    /// Returns `None` (without consuming) if no digit is next or the value
    /// overflows `u64`.
    pub(crate) fn number(&mut self) -> Option<u64> {
        let mut end = self.pos;
        let mut value: u64 = 0;
        while let Some(&b) = self.bytes.get(end) {
            if !b.is_ascii_digit() {
                break;
            }
            value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
            end += 1;
        }
        if end == self.pos {
            return None;
        }
        self.pos = end;
        Some(value)
    }

    /// Advance past everything up to the next digit and parse it.
    pub(crate) fn next_number(&mut self) -> Option<u64> {
        while self.bytes.get(self.pos).is_some_and(|b| !b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.number()
    }
}

/// Recognize a step header line.
///
/// # Examples
///
/// ```
/// use framelog::header::{parse_step_header, HeaderKind};
///
/// let header = parse_step_header("Step 3: Burning cells = 12").unwrap();
/// assert_eq!(header.step, 3);
/// assert_eq!(header.active, 12);
/// assert_eq!(header.kind, HeaderKind::BurningCells);
/// ```
pub fn parse_step_header(line: &str) -> Option<StepHeader> {
    let plain = strip_codes(line);
    let mut cur = TextCursor::new(plain.trim());

    if !cur.keyword("step") || cur.skip_ws() == 0 {
        return None;
    }
    let step = cur.number()?;
    cur.skip_ws();
    if !cur.punct(b':') {
        return None;
    }
    cur.skip_ws();
    if !cur.keyword("burning") {
        return None;
    }
    cur.skip_ws();

    // The shapes diverge here: "cells" vs. "=", so the order is not ambiguous
    let kind = if cur.keyword("cells") {
        cur.skip_ws();
        HeaderKind::BurningCells
    } else {
        HeaderKind::Burning
    };
    if !cur.punct(b'=') {
        return None;
    }
    cur.skip_ws();
    let active = cur.number()?;

    Some(StepHeader { step, kind, active })
}

/// True if the line opens a new frame.
pub fn is_step_header(line: &str) -> bool {
    parse_step_header(line).is_some()
}
