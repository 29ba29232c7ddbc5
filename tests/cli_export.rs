//! CLI integration tests for the `framelog gif` and `framelog pngzip` commands.
//!
//! Exports use an installed monospace font when there is one and the
//! built-in bitmap face otherwise, so every test runs on every host.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const LOG: &str = "Step 1: Burning cells = 1\n\x1b[31m#\x1b[0m..\n\
    Step 2: Burning cells = 2\n\x1b[31m##\x1b[0m.\n\
    Step 3: Burning cells = 3\n\x1b[41m###\x1b[0m\n";

/// Get the path to the framelog binary.
fn framelog_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_framelog"))
}

fn fixture() -> TempDir {
    let dir = TempDir::new().expect("should create temp dir");
    fs::write(dir.path().join("run.log"), LOG).expect("should write log");
    fs::write(dir.path().join("framelog.toml"), "").expect("should write config");
    dir
}

/// Run framelog with the given arguments and return (stdout, stderr, exit code).
fn run(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(framelog_binary())
        .args(args)
        .arg("--config")
        .arg(dir.join("framelog.toml"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("FRAMELOG_FONT")
        .output()
        .expect("Failed to execute framelog");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

#[test]
fn test_gif_export() {
    let dir = fixture();
    let (stdout, stderr, code) = run(dir.path(), &["gif", "run.log", "-o", "out/replay.gif"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Saved:"));

    let bytes = fs::read(dir.path().join("out/replay.gif")).expect("gif should be written");
    let mut decoder = gif::DecodeOptions::new().read_info(Cursor::new(bytes)).unwrap();
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    assert_eq!(delays, vec![50, 50, 50]);
}

#[test]
fn test_gif_export_fps_and_range() {
    let dir = fixture();
    let (_, stderr, code) = run(
        dir.path(),
        &["gif", "run.log", "-o", "part.gif", "--start", "2", "--end", "9", "--fps", "10"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);

    let bytes = fs::read(dir.path().join("part.gif")).unwrap();
    let mut decoder = gif::DecodeOptions::new().read_info(Cursor::new(bytes)).unwrap();
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    assert_eq!(delays, vec![10, 10]);
}

#[test]
fn test_pngzip_export() {
    let dir = fixture();
    let (_, stderr, code) =
        run(dir.path(), &["pngzip", "run.log", "-o", "frames.zip", "--bg", "#000", "--end", "2"]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let bytes = fs::read(dir.path().join("frames.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(names, vec!["frame_00001.png", "frame_00002.png"]);

    let mut png = Vec::new();
    std::io::Read::read_to_end(&mut archive.by_name("frame_00001.png").unwrap(), &mut png)
        .unwrap();
    let image = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(*image.get_pixel(0, 0), image::Rgba([0, 0, 0, 255]));
}

#[test]
fn test_export_missing_log() {
    let dir = fixture();
    let (_, stderr, code) = run(dir.path(), &["gif", "absent.log", "-o", "x.gif"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("Error:"));
    assert!(!dir.path().join("x.gif").exists());
}

#[test]
fn test_export_unusable_font() {
    let dir = fixture();
    fs::write(dir.path().join("broken.ttf"), b"not a font").unwrap();
    let (_, stderr, code) =
        run(dir.path(), &["pngzip", "run.log", "-o", "x.zip", "--font", "broken.ttf"]);
    assert_eq!(code, 1, "a broken font means export is unavailable");
    assert!(stderr.contains("failed to parse font"), "stderr: {}", stderr);
    assert!(!dir.path().join("x.zip").exists());
}

#[test]
fn test_export_bad_background() {
    let dir = fixture();
    let (_, stderr, code) = run(dir.path(), &["gif", "run.log", "-o", "x.gif", "--bg", "navy"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("invalid background color"), "stderr: {}", stderr);
}

#[test]
fn test_export_rejects_oversized_font_size_in_config() {
    let dir = fixture();
    fs::write(dir.path().join("framelog.toml"), "[render]\nfont_size = 4000000000\n").unwrap();
    let (_, stderr, code) = run(dir.path(), &["gif", "run.log", "-o", "x.gif"]);
    assert_eq!(code, 1, "stderr: {}", stderr);
    assert!(stderr.contains("render.font_size"), "stderr: {}", stderr);
    assert!(!dir.path().join("x.gif").exists());
}

#[test]
fn test_export_rejects_oversized_font_size_flag() {
    let dir = fixture();
    let (_, _, code) = run(dir.path(), &["gif", "run.log", "-o", "x.gif", "--font-size", "100000"]);
    assert_eq!(code, 2);
    assert!(!dir.path().join("x.gif").exists());
}
