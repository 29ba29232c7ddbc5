//! Color model for SGR color codes
//!
//! Converts the compact color codes found in log output into explicit RGB
//! values:
//! - Basic 16-color foreground (`30-37`, `90-97`) and background
//!   (`40-47`, `100-107`) codes
//! - The 256-entry extended palette addressed by `38;5;n` / `48;5;n`
//!
//! Also parses and formats `#RRGGBB` strings for user-supplied colors.

use image::Rgb;
use thiserror::Error;

/// Fallback for palette indices outside `0..=255`
pub const NEUTRAL_GRAY: Rgb<u8> = Rgb([0xcc, 0xcc, 0xcc]);

/// Foreground used when a run carries no explicit color
pub const DEFAULT_FOREGROUND: Rgb<u8> = Rgb([0xdd, 0xdd, 0xdd]);

/// Default canvas background for rasterized frames
pub const DEFAULT_BACKGROUND: Rgb<u8> = Rgb([0x11, 0x11, 0x11]);

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Input string doesn't start with '#'
    #[error("color must start with '#'")]
    MissingHash,
    /// Invalid length (must be 3 or 6 hex chars after #)
    #[error("invalid color length {0}, expected 3 or 6")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

const fn rgb(hex: u32) -> Rgb<u8> {
    Rgb([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
}

/// Normal-intensity colors for codes 30-37 (foreground) and 40-47 (background)
const NORMAL: [Rgb<u8>; 8] = [
    rgb(0x000000),
    rgb(0xb22222),
    rgb(0x228b22),
    rgb(0xb8860b),
    rgb(0x1e90ff),
    rgb(0x9932cc),
    rgb(0x20b2aa),
    rgb(0xbfbfbf),
];

/// Bright foreground colors for codes 90-97
const BRIGHT_FG: [Rgb<u8>; 8] = [
    rgb(0x808080),
    rgb(0xff4d4d),
    rgb(0x59c659),
    rgb(0xffd24d),
    rgb(0x4d88ff),
    rgb(0xcc66ff),
    rgb(0x33cccc),
    rgb(0xffffff),
];

/// Bright background colors for codes 100-107
const BRIGHT_BG: [Rgb<u8>; 8] = [
    rgb(0x555555),
    rgb(0xff6b6b),
    rgb(0x6bd36b),
    rgb(0xffe27a),
    rgb(0x7aa7ff),
    rgb(0xda8cff),
    rgb(0x66e0e0),
    rgb(0xf7f7f7),
];

/// xterm "system colors" approximation for extended indices 0-15
const SYSTEM: [Rgb<u8>; 16] = [
    rgb(0x000000),
    rgb(0x800000),
    rgb(0x008000),
    rgb(0x808000),
    rgb(0x000080),
    rgb(0x800080),
    rgb(0x008080),
    rgb(0xc0c0c0),
    rgb(0x808080),
    rgb(0xff0000),
    rgb(0x00ff00),
    rgb(0xffff00),
    rgb(0x0000ff),
    rgb(0xff00ff),
    rgb(0x00ffff),
    rgb(0xffffff),
];

/// Look up a basic foreground code (`30-37`, `90-97`).
///
/// Returns `None` for any other code.
pub fn basic_fg(code: u32) -> Option<Rgb<u8>> {
    match code {
        30..=37 => Some(NORMAL[(code - 30) as usize]),
        90..=97 => Some(BRIGHT_FG[(code - 90) as usize]),
        _ => None,
    }
}

/// Look up a basic background code (`40-47`, `100-107`).
///
/// Returns `None` for any other code.
pub fn basic_bg(code: u32) -> Option<Rgb<u8>> {
    match code {
        40..=47 => Some(NORMAL[(code - 40) as usize]),
        100..=107 => Some(BRIGHT_BG[(code - 100) as usize]),
        _ => None,
    }
}

/// Convert an extended (256-color) palette index to RGB.
///
/// - `0..=15`: fixed system-color table
/// - `16..=231`: 6x6x6 color cube, each digit `v` maps to `0` or `55 + 40*v`
/// - `232..=255`: 24-step grayscale ramp starting at 8 in steps of 10
///
/// Any other value maps to [`NEUTRAL_GRAY`].
///
/// # Examples
///
/// ```
/// use framelog::color::{extended_color, to_hex};
///
/// assert_eq!(to_hex(extended_color(16)), "#000000");
/// assert_eq!(to_hex(extended_color(231)), "#ffffff");
/// assert_eq!(to_hex(extended_color(232)), "#080808");
/// assert_eq!(to_hex(extended_color(255)), "#eeeeee");
/// ```
pub fn extended_color(n: u32) -> Rgb<u8> {
    match n {
        0..=15 => SYSTEM[n as usize],
        16..=231 => {
            let n = n - 16;
            let level = |v: u32| if v == 0 { 0 } else { (55 + 40 * v) as u8 };
            Rgb([level(n / 36 % 6), level(n / 6 % 6), level(n % 6)])
        }
        232..=255 => {
            let v = (8 + 10 * (n - 232)) as u8;
            Rgb([v, v, v])
        }
        _ => NEUTRAL_GRAY,
    }
}

/// Format a color as a lowercase `#rrggbb` string.
pub fn to_hex(color: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Parse a hex color string (`#RGB` or `#RRGGBB`).
///
/// # Examples
///
/// ```
/// use framelog::color::parse_hex_color;
///
/// assert_eq!(parse_hex_color("#111111").unwrap(), image::Rgb([17, 17, 17]));
/// assert_eq!(parse_hex_color("#F00").unwrap(), image::Rgb([255, 0, 0]));
/// ```
pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>, ColorError> {
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    let hex = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;

    let digits = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8).ok_or(ColorError::InvalidHex(c)))
        .collect::<Result<Vec<u8>, _>>()?;

    match digits.as_slice() {
        // #RGB -> #RRGGBB (doubled digits)
        [r, g, b] => Ok(Rgb([r * 17, g * 17, b * 17])),
        [r1, r2, g1, g2, b1, b2] => Ok(Rgb([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2])),
        _ => Err(ColorError::InvalidLength(digits.len())),
    }
}
