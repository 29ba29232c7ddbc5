//! SGR escape-code interpretation
//!
//! Turns one line of log text with embedded `ESC [ <params> m` sequences into
//! an ordered list of styled [`Run`]s. Only the color/weight subset of SGR is
//! interpreted; every other complete control sequence is dropped from the
//! output without changing the current style.
//!
//! Scanning is done by a small state machine ([`Scanner`]) so that the
//! interpreter, [`visual_len`] and [`strip_codes`] all agree on what counts
//! as a control sequence.

use crate::color::{basic_bg, basic_fg, extended_color};
use image::Rgb;

const ESC: u8 = 0x1b;

/// Graphic rendition applied to a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub bold: bool,
    pub fg: Option<Rgb<u8>>,
    pub bg: Option<Rgb<u8>>,
}

impl Style {
    /// True if this is the default (unstyled) rendition
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }
}

/// A maximal span of text sharing one [`Style`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: Style,
}

/// A lexical piece of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Plain text, emitted as-is
    Text(&'a str),
    /// Parameter string of an SGR sequence (`ESC [ params m`)
    Sgr(&'a str),
    /// Any other complete control sequence
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Saw ESC, expecting `[`
    Escape,
    /// Inside the parameter bytes (0x30-0x3F)
    Params,
    /// Inside the intermediate bytes (0x20-0x2F)
    Intermediate,
}

/// Result of scanning one control sequence starting at an ESC byte.
struct Sequence {
    /// Byte index one past the final byte
    end: usize,
    /// Byte range of the parameter bytes
    params: (usize, usize),
    final_byte: u8,
    has_intermediates: bool,
}

/// Scan a CSI sequence starting at `start` (which must hold ESC).
///
/// Returns `None` if the bytes do not form a complete sequence, in which
/// case the ESC is treated as ordinary text.
fn scan_sequence(bytes: &[u8], start: usize) -> Option<Sequence> {
    let mut state = State::Escape;
    let mut params_end = start + 2;
    let mut has_intermediates = false;

    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        state = match (state, b) {
            (State::Escape, b'[') => State::Params,
            (State::Escape, _) => return None,
            (State::Params, 0x30..=0x3f) => State::Params,
            (State::Params, 0x20..=0x2f) => {
                params_end = i;
                has_intermediates = true;
                State::Intermediate
            }
            (State::Intermediate, 0x20..=0x2f) => State::Intermediate,
            (State::Params | State::Intermediate, 0x40..=0x7e) => {
                if state == State::Params {
                    params_end = i;
                }
                return Some(Sequence {
                    end: i + 1,
                    params: (start + 2, params_end),
                    final_byte: b,
                    has_intermediates,
                });
            }
            _ => return None,
        };
    }
    None
}

/// Splits a line into plain text and control sequences.
struct Scanner<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.line.as_bytes();
        let start = self.pos;
        if start >= bytes.len() {
            return None;
        }

        let mut i = start;
        while i < bytes.len() {
            if bytes[i] == ESC {
                if let Some(seq) = scan_sequence(bytes, i) {
                    if i > start {
                        // Flush text first; the sequence is rescanned next call
                        self.pos = i;
                        return Some(Token::Text(&self.line[start..i]));
                    }
                    self.pos = seq.end;
                    let params = &self.line[seq.params.0..seq.params.1];
                    let is_sgr = seq.final_byte == b'm'
                        && !seq.has_intermediates
                        && params.bytes().all(|b| b.is_ascii_digit() || b == b';');
                    return Some(if is_sgr { Token::Sgr(params) } else { Token::Discarded });
                }
            }
            i += 1;
        }

        self.pos = bytes.len();
        Some(Token::Text(&self.line[start..]))
    }
}

/// Parse a decimal SGR parameter, saturating on overflow.
fn parse_param(p: &str) -> u32 {
    p.bytes()
        .fold(0u32, |acc, b| acc.saturating_mul(10).saturating_add(u32::from(b - b'0')))
}

/// Running interpreter state: current style plus text since the last change.
#[derive(Default)]
struct Interpreter {
    style: Style,
    buf: String,
    runs: Vec<Run>,
}

impl Interpreter {
    /// Close the open run and switch to `style`.
    fn set(&mut self, style: Style) {
        if style == self.style {
            return;
        }
        self.flush();
        self.style = style;
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.runs.push(Run { text: std::mem::take(&mut self.buf), style: self.style });
        }
    }

    fn apply_sgr(&mut self, params: &str) {
        if params.is_empty() || params == "0" {
            self.set(Style::default());
            return;
        }

        let codes: Vec<u32> = params.split(';').filter(|p| !p.is_empty()).map(parse_param).collect();

        let mut i = 0;
        while i < codes.len() {
            let code = codes[i];
            match code {
                0 => self.set(Style::default()),
                1 => self.set(Style { bold: true, ..self.style }),
                30..=37 | 90..=97 => self.set(Style { fg: basic_fg(code), ..self.style }),
                40..=47 | 100..=107 => self.set(Style { bg: basic_bg(code), ..self.style }),
                38 | 48 => match codes.get(i + 1) {
                    Some(5) => match codes.get(i + 2) {
                        Some(&n) => {
                            let color = Some(extended_color(n));
                            if code == 38 {
                                self.set(Style { fg: color, ..self.style });
                            } else {
                                self.set(Style { bg: color, ..self.style });
                            }
                            i += 2;
                        }
                        // Dangling selector at the end of the list
                        None => i += 1,
                    },
                    // True color is outside the palette model; drop r;g;b
                    Some(2) => i += 1 + (codes.len() - i - 2).min(3),
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }
    }

    fn finish(mut self) -> Vec<Run> {
        self.flush();
        self.runs
    }
}

/// Interpret one line into styled runs.
///
/// Concatenating the text of the returned runs yields [`strip_codes`] of the
/// input. Runs are never empty; adjacent text keeps one run as long as the
/// effective style does not change.
///
/// # Examples
///
/// ```
/// use framelog::ansi::parse_runs;
/// use framelog::color::to_hex;
///
/// let runs = parse_runs("\x1b[1m\x1b[34mHot\x1b[0m");
/// assert_eq!(runs.len(), 1);
/// assert_eq!(runs[0].text, "Hot");
/// assert!(runs[0].style.bold);
/// assert_eq!(runs[0].style.fg.map(to_hex).as_deref(), Some("#1e90ff"));
/// ```
pub fn parse_runs(line: &str) -> Vec<Run> {
    let mut interp = Interpreter::default();
    for token in Scanner::new(line) {
        match token {
            Token::Text(text) => interp.buf.push_str(text),
            Token::Sgr(params) => interp.apply_sgr(params),
            Token::Discarded => {}
        }
    }
    interp.finish()
}

/// Remove every control sequence from a line.
pub fn strip_codes(line: &str) -> String {
    Scanner::new(line)
        .filter_map(|token| match token {
            Token::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

/// Number of characters left after stripping control sequences.
///
/// Used for layout sizing only.
pub fn visual_len(line: &str) -> usize {
    Scanner::new(line)
        .map(|token| match token {
            Token::Text(text) => text.chars().count(),
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{parse_hex_color, to_hex};
    use proptest::prelude::*;

    fn hex(s: &str) -> Option<Rgb<u8>> {
        Some(parse_hex_color(s).unwrap())
    }

    fn texts(runs: &[Run]) -> Vec<&str> {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_plain_text_single_default_run() {
        let runs = parse_runs("Burning cells: 12");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Burning cells: 12");
        assert!(runs[0].style.is_default());
    }

    #[test]
    fn test_empty_line_no_runs() {
        assert!(parse_runs("").is_empty());
        assert!(parse_runs("\x1b[31m\x1b[0m").is_empty());
    }

    #[test]
    fn test_bold_blue_scenario() {
        let runs = parse_runs("\x1b[1m\x1b[34mHot\x1b[0m");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Hot");
        assert!(runs[0].style.bold);
        assert_eq!(to_hex(runs[0].style.fg.unwrap()), "#1e90ff");
        assert_eq!(runs[0].style.bg, None);
    }

    #[test]
    fn test_reset_splits_runs() {
        let runs = parse_runs("\x1b[31mfire\x1b[0m ok");
        assert_eq!(texts(&runs), vec!["fire", " ok"]);
        assert_eq!(runs[0].style.fg, hex("#b22222"));
        assert!(runs[1].style.is_default());
    }

    #[test]
    fn test_empty_params_is_reset() {
        let runs = parse_runs("\x1b[1mA\x1b[mB");
        assert_eq!(texts(&runs), vec!["A", "B"]);
        assert!(runs[0].style.bold);
        assert!(!runs[1].style.bold);
    }

    #[test]
    fn test_combined_params_apply_in_order() {
        let runs = parse_runs("\x1b[1;97;41mX");
        assert_eq!(runs.len(), 1);
        let style = runs[0].style;
        assert!(style.bold);
        assert_eq!(style.fg, hex("#ffffff"));
        assert_eq!(style.bg, hex("#b22222"));
    }

    #[test]
    fn test_reset_inside_param_list() {
        let runs = parse_runs("\x1b[31mA\x1b[0;1mB");
        assert_eq!(texts(&runs), vec!["A", "B"]);
        assert_eq!(runs[1].style, Style { bold: true, fg: None, bg: None });
    }

    #[test]
    fn test_bright_background() {
        let runs = parse_runs("\x1b[107m \x1b[0m");
        assert_eq!(runs[0].style.bg, hex("#f7f7f7"));
    }

    #[test]
    fn test_extended_foreground_and_background() {
        let runs = parse_runs("\x1b[38;5;178m\x1b[48;5;52mT");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].style.fg, Some(extended_color(178)));
        assert_eq!(runs[0].style.bg, Some(extended_color(52)));
    }

    #[test]
    fn test_extended_followed_by_more_params() {
        let runs = parse_runs("\x1b[38;5;196;1mT");
        assert_eq!(runs[0].style.fg, hex("#ff0000"));
        assert!(runs[0].style.bold);
    }

    #[test]
    fn test_extended_missing_selector_is_ignored() {
        // 38 without ;5 is dropped; 34 still applies on its own
        let runs = parse_runs("\x1b[38;34mT");
        assert_eq!(runs[0].style.fg, hex("#1e90ff"));
    }

    #[test]
    fn test_extended_missing_index_is_ignored() {
        let runs = parse_runs("a\x1b[38;5mb");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "ab");
        assert!(runs[0].style.is_default());
    }

    #[test]
    fn test_truecolor_operands_are_not_reinterpreted() {
        // The 0 components must not act as resets
        let runs = parse_runs("\x1b[1m\x1b[38;2;0;0;0mT");
        assert_eq!(runs.len(), 1);
        assert!(runs[0].style.bold);
        assert_eq!(runs[0].style.fg, None);
    }

    #[test]
    fn test_unknown_sgr_codes_ignored() {
        let runs = parse_runs("a\x1b[4mb\x1b[22mc");
        assert_eq!(texts(&runs), vec!["abc"]);
    }

    #[test]
    fn test_non_sgr_sequences_discarded() {
        let runs = parse_runs("\x1b[2J\x1b[1;1Hgrid\x1b[?25l");
        assert_eq!(texts(&runs), vec!["grid"]);
        assert!(runs[0].style.is_default());
    }

    #[test]
    fn test_sgr_with_colon_params_discarded() {
        let runs = parse_runs("\x1b[4:3mx");
        assert_eq!(texts(&runs), vec!["x"]);
        assert!(runs[0].style.is_default());
    }

    #[test]
    fn test_lone_escape_is_text() {
        assert_eq!(strip_codes("a\x1bb"), "a\x1bb");
        assert_eq!(strip_codes("tail\x1b[31"), "tail\x1b[31");
    }

    #[test]
    fn test_redundant_codes_keep_run_maximal() {
        let runs = parse_runs("\x1b[1mA\x1b[1mB");
        assert_eq!(texts(&runs), vec!["AB"]);
    }

    #[test]
    fn test_unicode_text_preserved() {
        let runs = parse_runs("\x1b[32m🔥█\x1b[0m·");
        assert_eq!(texts(&runs), vec!["🔥█", "·"]);
    }

    #[test]
    fn test_huge_param_saturates() {
        let runs = parse_runs("\x1b[38;5;99999999999mX");
        assert_eq!(runs[0].style.fg, Some(crate::color::NEUTRAL_GRAY));
    }

    #[test]
    fn test_visual_len_strips_codes() {
        assert_eq!(visual_len("\x1b[1mStep 3\x1b[0m: x"), 9);
        assert_eq!(visual_len(""), 0);
        assert_eq!(visual_len("🔥🔥"), 2);
    }

    #[test]
    fn test_strip_codes() {
        assert_eq!(strip_codes("\x1b[1mStep 3\x1b[0m:"), "Step 3:");
    }

    fn fragment() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z0-9 .:=#]{0,8}",
            "\x1b\\[[0-9;]{0,9}m",
            Just("\x1b[0m".to_string()),
            Just("\x1b[38;5;178m".to_string()),
            Just("\x1b[2K".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_runs_concatenate_to_stripped(parts in prop::collection::vec(fragment(), 0..12)) {
            let line: String = parts.concat();
            let joined: String = parse_runs(&line).iter().map(|r| r.text.as_str()).collect();
            prop_assert_eq!(&joined, &strip_codes(&line));
            prop_assert_eq!(joined.chars().count(), visual_len(&line));
        }

        #[test]
        fn prop_stripped_is_plain_fragments(parts in prop::collection::vec(fragment(), 0..12)) {
            let line: String = parts.concat();
            let plain: String = parts.iter().filter(|p| !p.starts_with('\x1b')).cloned().collect();
            prop_assert_eq!(strip_codes(&line), plain);
        }

        #[test]
        fn prop_plain_text_is_one_default_run(text in "[^\x1b]{1,40}") {
            let runs = parse_runs(&text);
            prop_assert_eq!(runs.len(), 1);
            prop_assert_eq!(&runs[0].text, &text);
            prop_assert!(runs[0].style.is_default());
        }

        #[test]
        fn prop_runs_are_never_empty(line in ".{0,60}") {
            prop_assert!(parse_runs(&line).iter().all(|r| !r.text.is_empty()));
        }
    }
}
