//! The loaded-log context and its operations
//!
//! A [`Session`] owns at most one loaded log at a time. Loading builds the
//! new log completely before swapping it in, so a failed load leaves the
//! previous one untouched. Readers clone an `Arc` under a short read lock
//! and work without holding it.

use crate::annotations::Annotations;
use crate::color::{parse_hex_color, to_hex, ColorError, DEFAULT_BACKGROUND};
use crate::frames::{FrameError, FrameStore, StoreMode};
use crate::gif::encode_gif;
use crate::markup::ansi_to_html;
use crate::metrics::Metrics;
use crate::output::{encode_png_zip, OutputError};
use crate::raster::{RasterError, RasterOptions, Rasterizer, MAX_FONT_SIZE, MAX_PADDING};
use image::{Rgb, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Coarse classification of session failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    BadInput,
    CapabilityMissing,
    Internal,
}

/// Error type for session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("annotation file not found: {}", .0.display())]
    AnnotationsNotFound(PathBuf),
    #[error("failed to read annotations '{}': {source}", .path.display())]
    Annotations {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no log loaded")]
    NotLoaded,
    #[error("invalid background color '{value}': {source}")]
    Background {
        value: String,
        #[source]
        source: ColorError,
    },
    #[error("font size {0} outside 1..=512")]
    FontSize(u32),
    #[error("padding {x}x{y} exceeds 1024 pixels")]
    Padding { x: u32, y: u32 },
    #[error("image export unavailable: no glyph source installed")]
    NoRasterizer,
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Frame(FrameError::NotFound(_)) | SessionError::AnnotationsNotFound(_) => {
                ErrorKind::NotFound
            }
            SessionError::Frame(FrameError::NoFrames(_) | FrameError::OutOfRange { .. })
            | SessionError::NotLoaded
            | SessionError::Background { .. }
            | SessionError::FontSize(_)
            | SessionError::Padding { .. }
            | SessionError::Output(OutputError::TooLarge { .. }) => ErrorKind::BadInput,
            SessionError::NoRasterizer | SessionError::Raster(_) => ErrorKind::CapabilityMissing,
            SessionError::Frame(FrameError::Io { .. })
            | SessionError::Annotations { .. }
            | SessionError::Output(_) => ErrorKind::Internal,
        }
    }
}

/// What to load.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    pub log: PathBuf,
    /// Byte-offset index; `<log stem>.index.jsonl` is probed when absent
    pub index: Option<PathBuf>,
    pub annotations: Option<PathBuf>,
}

impl LoadRequest {
    pub fn new(log: impl Into<PathBuf>) -> Self {
        Self { log: log.into(), ..Self::default() }
    }
}

/// Result of a successful load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub num_frames: usize,
    pub mode: StoreMode,
    pub skipped_index_lines: usize,
    pub metrics: Metrics,
    pub has_annotations: bool,
}

/// One frame prepared for display.
#[derive(Debug, Clone, Serialize)]
pub struct FrameView {
    pub index: usize,
    pub html: String,
    pub active: Option<u64>,
    pub natural: Option<u64>,
    pub extinguished: Option<u64>,
    pub annotations: Vec<String>,
}

/// Parameters for image export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// First frame (1-based); defaults to 1
    pub start: Option<usize>,
    /// Last frame (inclusive); defaults to the last frame
    pub end: Option<usize>,
    pub fps: f64,
    pub font_size: u32,
    /// `#rgb` or `#rrggbb`
    pub background: String,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            fps: 2.0,
            font_size: 14,
            background: to_hex(DEFAULT_BACKGROUND),
        }
    }
}

/// Clamp a requested frame range to `1..=n` (`n >= 1`).
///
/// `end` never precedes `start`.
pub fn clamp_range(start: Option<usize>, end: Option<usize>, n: usize) -> (usize, usize) {
    let n = n.max(1);
    let start = start.unwrap_or(1).clamp(1, n);
    let end = end.unwrap_or(n).clamp(1, n).max(start);
    (start, end)
}

/// Companion index path probed next to a log: `run.log` -> `run.index.jsonl`.
pub fn sibling_index_path(log: &Path) -> PathBuf {
    log.with_extension("index.jsonl")
}

#[derive(Debug)]
struct LoadedLog {
    store: FrameStore,
    metrics: Metrics,
    annotations: Option<Annotations>,
}

impl LoadedLog {
    fn summary(&self) -> LoadSummary {
        LoadSummary {
            num_frames: self.store.len(),
            mode: self.store.mode(),
            skipped_index_lines: self.store.skipped_index_lines(),
            metrics: self.metrics.clone(),
            has_annotations: self.annotations.is_some(),
        }
    }
}

/// Context holding the currently loaded log and the optional rasterizer.
pub struct Session {
    current: RwLock<Option<Arc<LoadedLog>>>,
    rasterizer: Option<Rasterizer>,
    padding: (u32, u32),
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session without image export.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            rasterizer: None,
            padding: RasterOptions::default().padding,
        }
    }

    /// Install a rasterizer, enabling image export.
    pub fn with_rasterizer(mut self, rasterizer: Rasterizer) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Set the canvas padding used for exports.
    pub fn with_padding(mut self, padding: (u32, u32)) -> Self {
        self.padding = padding;
        self
    }

    pub fn can_export(&self) -> bool {
        self.rasterizer.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn loaded(&self) -> Result<Arc<LoadedLog>, SessionError> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(Arc::clone).ok_or(SessionError::NotLoaded)
    }

    /// Load a log, replacing the current one only on success.
    pub fn load(&self, req: &LoadRequest) -> Result<LoadSummary, SessionError> {
        let started = Instant::now();
        let index = req.index.clone().unwrap_or_else(|| sibling_index_path(&req.log));
        debug!(log = %req.log.display(), index = %index.display(), "loading log");

        let store = FrameStore::open(&req.log, Some(index.as_path()))?;

        let annotations = match &req.annotations {
            Some(path) if !path.is_file() => {
                return Err(SessionError::AnnotationsNotFound(path.clone()))
            }
            Some(path) => Some(Annotations::load(path).map_err(|source| {
                SessionError::Annotations { path: path.clone(), source }
            })?),
            None => None,
        };

        let metrics = Metrics::from_store(&store)?;
        let loaded = LoadedLog { store, metrics, annotations };
        let summary = loaded.summary();

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(loaded));

        info!(
            log = %req.log.display(),
            frames = summary.num_frames,
            mode = ?summary.mode,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "log loaded"
        );
        Ok(summary)
    }

    /// Summary of the current log.
    pub fn summary(&self) -> Result<LoadSummary, SessionError> {
        Ok(self.loaded()?.summary())
    }

    /// Frame `k` (1-based) as markup with its metrics and annotations.
    pub fn frame(&self, k: usize) -> Result<FrameView, SessionError> {
        let log = self.loaded()?;
        let text = log.store.get(k)?;
        let metrics = log.metrics.get(k).unwrap_or_default();
        let annotations = log
            .annotations
            .as_ref()
            .map(|a| a.for_step(k).to_vec())
            .unwrap_or_default();

        Ok(FrameView {
            index: k,
            html: ansi_to_html(&text),
            active: metrics.active,
            natural: metrics.natural,
            extinguished: metrics.extinguished,
            annotations,
        })
    }

    /// Export a frame range as an animated GIF.
    pub fn export_gif(&self, req: &ExportRequest) -> Result<Vec<u8>, SessionError> {
        let (frames, background) = self.render_range(req)?;
        let images: Vec<RgbaImage> = frames.into_iter().map(|(_, image)| image).collect();
        let bytes = encode_gif(&images, req.fps, background)?;
        info!(frames = images.len(), bytes = bytes.len(), fps = req.fps, "exported gif");
        Ok(bytes)
    }

    /// Export a frame range as a ZIP of numbered PNGs.
    pub fn export_png_zip(&self, req: &ExportRequest) -> Result<Vec<u8>, SessionError> {
        let (frames, _) = self.render_range(req)?;
        let bytes = encode_png_zip(&frames)?;
        info!(frames = frames.len(), bytes = bytes.len(), "exported png archive");
        Ok(bytes)
    }

    /// Rasterize the clamped range in parallel, returned in frame order.
    fn render_range(
        &self,
        req: &ExportRequest,
    ) -> Result<(Vec<(usize, RgbaImage)>, Rgb<u8>), SessionError> {
        let log = self.loaded()?;
        let rasterizer = self.rasterizer.as_ref().ok_or(SessionError::NoRasterizer)?;

        let background = parse_hex_color(&req.background).map_err(|source| {
            SessionError::Background { value: req.background.clone(), source }
        })?;
        if !(1..=MAX_FONT_SIZE).contains(&req.font_size) {
            return Err(SessionError::FontSize(req.font_size));
        }
        let (pad_x, pad_y) = self.padding;
        if pad_x > MAX_PADDING || pad_y > MAX_PADDING {
            return Err(SessionError::Padding { x: pad_x, y: pad_y });
        }

        let (start, end) = clamp_range(req.start, req.end, log.store.len());
        debug!(start, end, font_size = req.font_size, "rasterizing frames");

        let opts = RasterOptions { font_size: req.font_size, background, padding: self.padding };
        let frames = (start..=end)
            .into_par_iter()
            .map(|k| -> Result<(usize, RgbaImage), SessionError> {
                let text = log.store.get(k)?;
                Ok((k, rasterizer.render(&text, &opts)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((frames, background))
    }
}
