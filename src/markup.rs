//! HTML rendering of styled frames
//!
//! Produces inline-styled markup for interactive viewing: one `<span>` per
//! run, `<br/>` between lines, and `&nbsp;` for lines with no visible text.

use crate::ansi::{parse_runs, Run};
use crate::color::to_hex;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_span(out: &mut String, run: &Run) {
    let mut bits = Vec::with_capacity(3);
    if let Some(fg) = run.style.fg {
        bits.push(format!("color:{}", to_hex(fg)));
    }
    if let Some(bg) = run.style.bg {
        bits.push(format!("background-color:{}", to_hex(bg)));
    }
    if run.style.bold {
        bits.push("font-weight:bold".to_string());
    }

    if bits.is_empty() {
        out.push_str("<span>");
    } else {
        out.push_str("<span style=\"");
        out.push_str(&bits.join(";"));
        out.push_str("\">");
    }
    out.push_str(&escape_html(&run.text));
    out.push_str("</span>");
}

/// Render one line of raw text to markup (no line break handling).
pub fn line_to_html(line: &str) -> String {
    let runs = parse_runs(line);
    if runs.is_empty() {
        return "&nbsp;".to_string();
    }
    let mut out = String::new();
    for run in &runs {
        push_span(&mut out, run);
    }
    out
}

/// Render a multi-line frame to markup.
///
/// # Examples
///
/// ```
/// use framelog::markup::ansi_to_html;
///
/// let html = ansi_to_html("\x1b[31mfire\x1b[0m\n\nok");
/// assert_eq!(
///     html,
///     "<span style=\"color:#b22222\">fire</span><br/>&nbsp;<br/><span>ok</span>"
/// );
/// ```
pub fn ansi_to_html(text: &str) -> String {
    text.lines().map(line_to_html).collect::<Vec<_>>().join("<br/>")
}
