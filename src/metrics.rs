//! Per-frame metric extraction
//!
//! Every frame yields three optional numbers:
//!
//! - `active`: the count carried by the step header
//! - `natural`: cumulative natural burnouts
//! - `extinguished`: cumulative cells extinguished by agents
//!
//! The body fields are looked up in the first five lines after the header.
//! Each field accepts two label spellings. Rules are tried in order on every
//! line and the first one that yields a number wins for that line; a later
//! line in the window overrides an earlier one.

use crate::ansi::strip_codes;
use crate::frames::{FrameError, FrameStore};
use crate::header::{parse_step_header, TextCursor};
use serde::Serialize;

/// Body lines inspected after the header
const BODY_WINDOW: usize = 5;

/// How a label is matched within a line.
#[derive(Debug, Clone, Copy)]
enum LabelRule {
    /// Line starts with the label; value is the first number after it
    Leading(&'static str),
    /// Label anywhere in the line, then optional `=`, then the number
    Inline(&'static str),
    /// Label anywhere in the line, then a mandatory `=`, then the number
    Assigned(&'static str),
}

const NATURAL_RULES: &[LabelRule] = &[
    LabelRule::Leading("natural burnouts"),
    LabelRule::Inline("natural burnouts"),
    LabelRule::Inline("natural"),
];

const EXTINGUISHED_RULES: &[LabelRule] = &[
    LabelRule::Leading("extinguished by agents"),
    LabelRule::Assigned("extinguished"),
];

impl LabelRule {
    /// Try the rule against a lowercased, trimmed line.
    fn extract(self, line: &str) -> Option<u64> {
        match self {
            LabelRule::Leading(label) => {
                let rest = line.strip_prefix(label)?;
                TextCursor::new(rest).next_number()
            }
            LabelRule::Inline(label) => find_after(line, label, false),
            LabelRule::Assigned(label) => find_after(line, label, true),
        }
    }
}

/// Scan every occurrence of `label` for a following `[=] number`.
fn find_after(line: &str, label: &str, require_eq: bool) -> Option<u64> {
    line.match_indices(label).find_map(|(at, _)| {
        let mut cur = TextCursor::new(&line[at + label.len()..]);
        cur.skip_ws();
        let has_eq = cur.punct(b'=');
        if require_eq && !has_eq {
            return None;
        }
        cur.skip_ws();
        cur.number()
    })
}

fn first_match(rules: &[LabelRule], line: &str) -> Option<u64> {
    rules.iter().find_map(|rule| rule.extract(line))
}

/// Metrics for a single frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameMetrics {
    pub active: Option<u64>,
    pub natural: Option<u64>,
    pub extinguished: Option<u64>,
}

/// Extract metrics from one frame's raw text.
///
/// # Examples
///
/// ```
/// use framelog::metrics::extract_frame;
///
/// let m = extract_frame("Step 3: Burning cells = 12\nNatural burnouts: 4\nExtinguished by agents: 9");
/// assert_eq!(m.active, Some(12));
/// assert_eq!(m.natural, Some(4));
/// assert_eq!(m.extinguished, Some(9));
/// ```
pub fn extract_frame(frame: &str) -> FrameMetrics {
    let mut lines = frame.lines();
    let active = lines.next().and_then(parse_step_header).map(|h| h.active);

    let mut metrics = FrameMetrics { active, ..FrameMetrics::default() };
    for line in lines.take(BODY_WINDOW) {
        let line = strip_codes(line).trim().to_ascii_lowercase();
        if let Some(n) = first_match(NATURAL_RULES, &line) {
            metrics.natural = Some(n);
        }
        if let Some(n) = first_match(EXTINGUISHED_RULES, &line) {
            metrics.extinguished = Some(n);
        }
    }
    metrics
}

/// Three positionally aligned metric sequences, one slot per frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub active: Vec<Option<u64>>,
    pub natural: Vec<Option<u64>>,
    pub extinguished: Vec<Option<u64>>,
}

impl Metrics {
    /// Build metrics from frames in order.
    pub fn from_frames<'a, I>(frames: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut metrics = Metrics::default();
        for frame in frames {
            metrics.push(extract_frame(frame));
        }
        metrics
    }

    /// Visit every frame of a store once.
    pub fn from_store(store: &FrameStore) -> Result<Self, FrameError> {
        let mut metrics = Metrics::default();
        for frame in store.iter() {
            metrics.push(extract_frame(&frame?));
        }
        Ok(metrics)
    }

    fn push(&mut self, m: FrameMetrics) {
        self.active.push(m.active);
        self.natural.push(m.natural);
        self.extinguished.push(m.extinguished);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Metrics of frame `k` (1-based); `None` if out of range.
    pub fn get(&self, k: usize) -> Option<FrameMetrics> {
        let i = k.checked_sub(1)?;
        Some(FrameMetrics {
            active: *self.active.get(i)?,
            natural: self.natural[i],
            extinguished: self.extinguished[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_a_frame() {
        let frame = "Step 3: Burning cells = 12\n\
                     ..##..\n\
                     Natural burnouts: 4\n\
                     Extinguished by agents: 7";
        assert_eq!(
            extract_frame(frame),
            FrameMetrics { active: Some(12), natural: Some(4), extinguished: Some(7) }
        );
    }

    #[test]
    fn test_kind_b_inline_fields() {
        let frame = "Step 8: Burning=5, Extinguished=2, Natural Burnouts=1\n\
                     totals: extinguished = 11, natural=6";
        let m = extract_frame(frame);
        assert_eq!(m.active, Some(5));
        // Header line fields are not part of the body window
        assert_eq!(m.extinguished, Some(11));
        assert_eq!(m.natural, Some(6));
    }

    #[test]
    fn test_inline_natural_burnouts_spelling() {
        let m = extract_frame("Step 1: Burning = 1\nBurning=1, Natural Burnouts = 3");
        assert_eq!(m.natural, Some(3));
    }

    #[test]
    fn test_leading_label_takes_first_number_after_label() {
        let m = extract_frame("Step 1: Burning = 1\nNatural burnouts (cumulative): 15 of 40");
        assert_eq!(m.natural, Some(15));
    }

    #[test]
    fn test_styled_body_lines() {
        let m = extract_frame("Step 1: Burning = 1\n\x1b[33mNatural burnouts:\x1b[0m 8");
        assert_eq!(m.natural, Some(8));
    }

    #[test]
    fn test_later_line_overrides() {
        let m = extract_frame("Step 1: Burning = 1\nnatural=2\nnatural=5");
        assert_eq!(m.natural, Some(5));
    }

    #[test]
    fn test_window_is_five_body_lines() {
        let frame = "Step 1: Burning = 1\na\nb\nc\nd\ne\nNatural burnouts: 9";
        assert_eq!(extract_frame(frame).natural, None);

        let frame = "Step 1: Burning = 1\na\nb\nc\nd\nNatural burnouts: 9";
        assert_eq!(extract_frame(frame).natural, Some(9));
    }

    #[test]
    fn test_extinguished_requires_assignment_inline() {
        let m = extract_frame("Step 1: Burning = 1\ncells extinguished 4");
        assert_eq!(m.extinguished, None);
    }

    #[test]
    fn test_label_without_number_is_absent() {
        let m = extract_frame("Step 1: Burning = 1\nNatural burnouts: n/a");
        assert_eq!(m.natural, None);
    }

    #[test]
    fn test_non_header_first_line() {
        let m = extract_frame("just text\nnatural=3");
        assert_eq!(m.active, None);
        assert_eq!(m.natural, Some(3));
    }

    #[test]
    fn test_metrics_alignment() {
        let metrics = Metrics::from_frames([
            "Step 1: Burning cells = 2\nNatural burnouts: 0",
            "Step 2: Burning cells = 4",
            "Step 3: Burning = 1\nextinguished=3",
        ]);
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics.active, vec![Some(2), Some(4), Some(1)]);
        assert_eq!(metrics.natural, vec![Some(0), None, None]);
        assert_eq!(metrics.extinguished, vec![None, None, Some(3)]);
        assert_eq!(metrics.get(3).unwrap().extinguished, Some(3));
        assert_eq!(metrics.get(0), None);
        assert_eq!(metrics.get(4), None);
    }

    #[test]
    fn test_from_store() {
        let store = FrameStore::from_text("Step 1: Burning = 6\nStep 2: Burning = 7\n");
        let metrics = Metrics::from_store(&store).unwrap();
        assert_eq!(metrics.active, vec![Some(6), Some(7)]);
    }
}
