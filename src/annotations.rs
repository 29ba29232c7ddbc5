//! Step-delimited companion annotations (agent status text)
//!
//! ```text
//! Step 1
//!   agent-0: moving north
//!   agent-1: extinguishing (4, 7)
//! Step 2
//!   agent-0: idle
//! ```
//!
//! A line starting with `step ` (any case) opens a new step; the non-empty
//! lines after it belong to that step. Step `k` is the `k`-th marker.

use std::fs;
use std::io;
use std::path::Path;

/// Annotation lines grouped by step, in marker order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    steps: Vec<Vec<String>>,
}

impl Annotations {
    /// Parse annotation text.
    pub fn parse(text: &str) -> Self {
        let mut steps: Vec<Vec<String>> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if is_step_marker(trimmed) {
                steps.push(Vec::new());
            } else if !trimmed.is_empty() {
                // Lines before the first marker have no step to belong to
                if let Some(current) = steps.last_mut() {
                    current.push(trimmed.to_string());
                }
            }
        }
        Self { steps }
    }

    /// Read and parse an annotation file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Lines for step `k` (1-based); empty if there is no such step.
    pub fn for_step(&self, k: usize) -> &[String] {
        match k.checked_sub(1).and_then(|i| self.steps.get(i)) {
            Some(lines) => lines.as_slice(),
            None => &[],
        }
    }

    /// Number of step markers seen.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn is_step_marker(line: &str) -> bool {
    line.get(..5).is_some_and(|head| head.eq_ignore_ascii_case("step "))
}
