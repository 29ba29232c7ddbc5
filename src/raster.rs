//! Rasterization of styled frames onto a monospace pixel grid
//!
//! Glyph shapes come from a [`GlyphSource`]. The standard source is
//! [`FontGlyphs`], a TrueType face loaded with `fontdue`. When no face can be
//! found, [`Rasterizer::discover`] falls back to the built-in
//! [`BitmapGlyphs`]. Markup viewing does not depend on any of it.
//!
//! Layout is a fixed grid: every line occupies one cell height, the canvas
//! width comes from the longest control-stripped line, and each run advances
//! the pen by its measured width.

use crate::ansi::{parse_runs, visual_len};
use crate::bitmap_font::BitmapGlyphs;
use crate::color::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::output::OutputError;
use fontdue::{Font, FontSettings};
use image::{Rgb, Rgba, RgbaImage};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extra pixels between lines on top of the font size
pub const LINE_SPACING: u32 = 2;

/// Largest accepted character size in pixels
pub const MAX_FONT_SIZE: u32 = 512;

/// Largest accepted padding on either axis
pub const MAX_PADDING: u32 = 1024;

/// Largest canvas edge in pixels
pub const MAX_CANVAS_SIDE: u32 = 16_384;

/// Largest canvas area in pixels (256 MiB of RGBA)
pub const MAX_CANVAS_PIXELS: u64 = 1 << 26;

/// Environment variable naming a TrueType font to use
pub const FONT_ENV: &str = "FRAMELOG_FONT";

/// Well-known monospace faces, tried in order
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/Library/Fonts/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
];

/// Error type for rasterization setup
#[derive(Debug, Error)]
pub enum RasterError {
    /// No usable font was found; image export is unavailable
    #[error("no monospace font available (searched {} locations); set FRAMELOG_FONT or [render].font", .0.len())]
    FontUnavailable(Vec<PathBuf>),
    /// Font file could not be read
    #[error("failed to read font '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Font file is not a usable TrueType/OpenType face
    #[error("failed to parse font '{}': {message}", .path.display())]
    Font { path: PathBuf, message: String },
}

/// A rasterized glyph: coverage mask plus placement relative to the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub xmin: i32,
    pub ymin: i32,
    pub width: usize,
    pub height: usize,
    /// Row-major coverage, `width * height` bytes
    pub coverage: Vec<u8>,
}

/// Provider of glyph metrics and bitmaps.
pub trait GlyphSource: Send + Sync {
    /// Horizontal advance of `ch` at `px` pixels.
    fn advance(&self, ch: char, px: f32) -> f32;

    /// Distance from the top of a line to the baseline.
    fn ascent(&self, px: f32) -> f32;

    /// Rasterize `ch`, from the bold face if `bold` and one exists.
    fn glyph(&self, ch: char, px: f32, bold: bool) -> Glyph;

    /// True if [`GlyphSource::glyph`] has a dedicated bold face.
    fn has_bold(&self) -> bool;
}

/// Glyphs from a TrueType/OpenType face via `fontdue`.
pub struct FontGlyphs {
    regular: Font,
    bold: Option<Font>,
    path: PathBuf,
}

fn parse_font(path: &Path) -> Result<Font, RasterError> {
    let bytes = fs::read(path)
        .map_err(|source| RasterError::Io { path: path.to_path_buf(), source })?;
    Font::from_bytes(bytes, FontSettings::default())
        .map_err(|message| RasterError::Font { path: path.to_path_buf(), message: message.to_string() })
}

/// Candidate paths for a bold variant next to a regular face.
fn bold_siblings(path: &Path) -> Vec<PathBuf> {
    let (Some(stem), Some(ext)) = (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) else {
        return Vec::new();
    };

    let mut names = Vec::new();
    if let Some(base) = stem.strip_suffix("-Regular") {
        names.push(format!("{base}-Bold.{ext}"));
    }
    names.push(format!("{stem}-Bold.{ext}"));
    names.into_iter().map(|name| path.with_file_name(name)).collect()
}

impl FontGlyphs {
    /// Load a face from a file, picking up a sibling `-Bold` face if present.
    pub fn load(path: &Path) -> Result<Self, RasterError> {
        let regular = parse_font(path)?;
        let bold = bold_siblings(path)
            .into_iter()
            .filter(|p| p.is_file())
            .find_map(|p| parse_font(&p).ok());
        debug!(font = %path.display(), bold = bold.is_some(), "loaded font");
        Ok(Self { regular, bold, path: path.to_path_buf() })
    }

    /// Find a face: `preferred`, then `$FRAMELOG_FONT`, then system locations.
    ///
    /// An explicitly named font that exists but fails to load is an error;
    /// missing files are skipped.
    pub fn discover(preferred: Option<&Path>) -> Result<Self, RasterError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        candidates.extend(preferred.map(Path::to_path_buf));
        if let Some(from_env) = env::var_os(FONT_ENV).filter(|v| !v.is_empty()) {
            candidates.push(PathBuf::from(from_env));
        }
        let explicit = candidates.len();
        candidates.extend(FONT_CANDIDATES.iter().map(PathBuf::from));

        for (i, path) in candidates.iter().enumerate() {
            if !path.is_file() {
                continue;
            }
            match Self::load(path) {
                Ok(glyphs) => {
                    info!(font = %path.display(), "using font");
                    return Ok(glyphs);
                }
                Err(e) if i < explicit => return Err(e),
                Err(e) => debug!(error = %e, "skipping font candidate"),
            }
        }
        Err(RasterError::FontUnavailable(candidates))
    }

    /// Path of the regular face.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GlyphSource for FontGlyphs {
    fn advance(&self, ch: char, px: f32) -> f32 {
        self.regular.metrics(ch, px).advance_width
    }

    fn ascent(&self, px: f32) -> f32 {
        self.regular.horizontal_line_metrics(px).map_or(px * 0.8, |m| m.ascent)
    }

    fn glyph(&self, ch: char, px: f32, bold: bool) -> Glyph {
        let font = match (&self.bold, bold) {
            (Some(face), true) => face,
            _ => &self.regular,
        };
        let (metrics, coverage) = font.rasterize(ch, px);
        Glyph {
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            width: metrics.width,
            height: metrics.height,
            coverage,
        }
    }

    fn has_bold(&self) -> bool {
        self.bold.is_some()
    }
}

/// Per-frame rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Character size in pixels
    pub font_size: u32,
    pub background: Rgb<u8>,
    /// Horizontal and vertical padding in pixels
    pub padding: (u32, u32),
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { font_size: 14, background: DEFAULT_BACKGROUND, padding: (8, 8) }
    }
}

fn opaque(color: Rgb<u8>) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

/// Renders frame text to bitmaps using a [`GlyphSource`].
pub struct Rasterizer {
    glyphs: Box<dyn GlyphSource>,
}

impl Rasterizer {
    pub fn new(glyphs: impl GlyphSource + 'static) -> Self {
        Self { glyphs: Box::new(glyphs) }
    }

    /// A rasterizer over [`FontGlyphs::discover`], or the built-in bitmap
    /// face when no font is installed.
    ///
    /// Errors from an explicitly named font are still returned.
    pub fn discover(preferred: Option<&Path>) -> Result<Self, RasterError> {
        match FontGlyphs::discover(preferred) {
            Ok(glyphs) => Ok(Self::new(glyphs)),
            Err(RasterError::FontUnavailable(searched)) => {
                warn!(searched = searched.len(), "no monospace font found; using built-in bitmap face");
                Ok(Self::new(BitmapGlyphs))
            }
            Err(e) => Err(e),
        }
    }

    /// Cell width (advance of `M`) and cell height for a character size.
    pub fn cell_size(&self, font_size: u32) -> (f32, u32) {
        (self.glyphs.advance('M', font_size as f32), font_size.saturating_add(LINE_SPACING))
    }

    /// Canvas dimensions for `lines` lines at most `max_cols` columns wide.
    ///
    /// Fails with [`OutputError::TooLarge`] when either edge exceeds
    /// [`MAX_CANVAS_SIDE`] or the area exceeds [`MAX_CANVAS_PIXELS`].
    pub fn canvas_size(
        &self,
        max_cols: usize,
        lines: usize,
        opts: &RasterOptions,
    ) -> Result<(u32, u32), OutputError> {
        let (pad_x, pad_y) = opts.padding;
        let (cell_w, cell_h) = self.cell_size(opts.font_size);

        // Float to int casts saturate, so an absurd advance cannot wrap
        let text_w = (f64::from(cell_w) * max_cols as f64) as u64;
        let width = (2 * u64::from(pad_x)).saturating_add(text_w).max(1);
        let height = (2 * u64::from(pad_y))
            .saturating_add(u64::from(cell_h).saturating_mul(lines as u64))
            .max(1);

        let side = u64::from(MAX_CANVAS_SIDE);
        if width > side || height > side || width * height > MAX_CANVAS_PIXELS {
            return Err(OutputError::TooLarge {
                width: u32::try_from(width).unwrap_or(u32::MAX),
                height: u32::try_from(height).unwrap_or(u32::MAX),
            });
        }
        Ok((width as u32, height as u32))
    }

    /// Render one frame's raw text.
    pub fn render(&self, text: &str, opts: &RasterOptions) -> Result<RgbaImage, OutputError> {
        let px = opts.font_size as f32;
        let (pad_x, pad_y) = opts.padding;

        let mut lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            lines.push("");
        }
        let max_cols = lines.iter().map(|l| visual_len(l)).max().unwrap_or(0);

        let (width, height) = self.canvas_size(max_cols, lines.len(), opts)?;
        let (_, cell_h) = self.cell_size(opts.font_size);
        let mut canvas = RgbaImage::from_pixel(width, height, opaque(opts.background));

        let ascent = self.glyphs.ascent(px).round() as i32;
        let bold_face = self.glyphs.has_bold();
        let mut cache: HashMap<(char, bool), Glyph> = HashMap::new();

        for (row, line) in lines.iter().enumerate() {
            let y = pad_y + row as u32 * cell_h;
            let mut x = pad_x as f32;

            for run in parse_runs(line) {
                let run_width: f32 = run.text.chars().map(|c| self.glyphs.advance(c, px)).sum();
                if let Some(bg) = run.style.bg {
                    fill_rect(&mut canvas, x as u32, y, run_width.round() as u32, cell_h, opaque(bg));
                }

                let fg = opaque(run.style.fg.unwrap_or(DEFAULT_FOREGROUND));
                let use_bold_face = run.style.bold && bold_face;
                let mut pen = x;
                for ch in run.text.chars() {
                    let glyph = cache
                        .entry((ch, use_bold_face))
                        .or_insert_with(|| self.glyphs.glyph(ch, px, use_bold_face));
                    let gx = pen.round() as i32 + glyph.xmin;
                    let gy = y as i32 + ascent - (glyph.height as i32 + glyph.ymin);
                    if run.style.bold && !bold_face {
                        blend_glyph(&mut canvas, gx + 1, gy, glyph, fg);
                    }
                    blend_glyph(&mut canvas, gx, gy, glyph, fg);
                    pen += self.glyphs.advance(ch, px);
                }
                x += run_width;
            }
        }

        Ok(canvas)
    }
}

/// Fill `[x, x+w) x [y, y+h)`, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = x.saturating_add(w).min(canvas.width());
    let y_end = y.saturating_add(h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

/// Alpha-blend a coverage mask in `color` onto the canvas.
fn blend_glyph(canvas: &mut RgbaImage, x: i32, y: i32, glyph: &Glyph, color: Rgba<u8>) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= ch {
            continue;
        }
        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= cw {
                continue;
            }
            let alpha = u16::from(glyph.coverage[row * glyph.width + col]);
            if alpha == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            for c in 0..3 {
                let blended = (u16::from(color[c]) * alpha + u16::from(dst[c]) * (255 - alpha)) / 255;
                dst[c] = blended as u8;
            }
            dst[3] = 255;
        }
    }
}
