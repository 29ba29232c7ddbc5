//! framelog - Library for replaying and exporting step-by-step simulation logs
//!
//! This library provides functionality to:
//! - Split a log into frames, by step headers or a byte-offset index
//! - Interpret the color/style escape codes inside each frame
//! - Render frames as inline-styled HTML or rasterize them to bitmaps
//! - Extract per-step metrics and attach step annotations
//! - Export frame ranges as animated GIFs or ZIP archives of PNGs

pub mod annotations;
pub mod ansi;
pub mod bitmap_font;
pub mod cli;
pub mod color;
pub mod config;
pub mod frames;
pub mod gif;
pub mod header;
pub mod index;
pub mod markup;
pub mod metrics;
pub mod output;
pub mod raster;
pub mod session;
