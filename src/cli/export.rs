//! Image export commands (gif, pngzip)

use std::process::ExitCode;

use crate::config::{merge_cli_overrides, FramelogConfig};
use crate::output::write_artifact;
use crate::raster::Rasterizer;
use crate::session::{clamp_range, ExportRequest, Session, SessionError};

use super::{report, ExportArgs, LoadArgs, EXIT_ERROR, EXIT_SUCCESS};

/// Kind of artifact to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Gif,
    PngZip,
}

/// Execute the gif or pngzip command
pub fn run_export(
    load: &LoadArgs,
    args: &ExportArgs,
    mut config: FramelogConfig,
    artifact: Artifact,
) -> ExitCode {
    merge_cli_overrides(&mut config, &args.overrides());

    let session = Session::new().with_padding(config.padding());
    let summary = match session.load(&load.request()) {
        Ok(summary) => summary,
        Err(e) => return report(&e),
    };

    let rasterizer = match Rasterizer::discover(config.render.font.as_deref()) {
        Ok(rasterizer) => rasterizer,
        Err(e) => return report(&SessionError::from(e)),
    };
    let session = session.with_rasterizer(rasterizer);

    let req = ExportRequest {
        start: args.start,
        end: args.end,
        fps: config.export.fps,
        font_size: config.render.font_size,
        background: config.render.background.clone(),
    };
    let result = match artifact {
        Artifact::Gif => session.export_gif(&req),
        Artifact::PngZip => session.export_png_zip(&req),
    };
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => return report(&e),
    };

    if let Err(e) = write_artifact(&bytes, &args.output) {
        eprintln!("Error: Failed to write {}: {}", args.output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    let (start, end) = clamp_range(args.start, args.end, summary.num_frames);
    println!("Saved: {} (frames {}-{})", args.output.display(), start, end);
    ExitCode::from(EXIT_SUCCESS)
}
