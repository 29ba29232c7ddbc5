//! PNG encoding, frame archives and artifact files

use image::{ImageOutputFormat, RgbaImage};
use std::io::{self, Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
    /// GIF encoding error
    Gif(gif::EncodingError),
    /// ZIP archive error
    Zip(zip::result::ZipError),
    /// Nothing to encode
    NoFrames,
    /// Canvas exceeds the format's dimension limits
    TooLarge { width: u32, height: u32 },
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
            OutputError::Gif(e) => write!(f, "GIF error: {}", e),
            OutputError::Zip(e) => write!(f, "ZIP error: {}", e),
            OutputError::NoFrames => write!(f, "no frames to encode"),
            OutputError::TooLarge { width, height } => {
                write!(f, "canvas {}x{} is too large to encode", width, height)
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
            OutputError::Gif(e) => Some(e),
            OutputError::Zip(e) => Some(e),
            OutputError::NoFrames | OutputError::TooLarge { .. } => None,
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

impl From<gif::EncodingError> for OutputError {
    fn from(e: gif::EncodingError) -> Self {
        OutputError::Gif(e)
    }
}

impl From<zip::result::ZipError> for OutputError {
    fn from(e: zip::result::ZipError) -> Self {
        OutputError::Zip(e)
    }
}

/// Minimum zero-padded width of frame numbers in archive entry names
pub const MIN_FRAME_DIGITS: usize = 5;

/// Digits needed so every frame number up to `last` shares one width.
pub fn frame_digits(last: usize) -> usize {
    let mut digits = 1;
    let mut rest = last / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits.max(MIN_FRAME_DIGITS)
}

/// Archive entry name for frame `k` padded to `width` digits: `frame_00001.png`.
pub fn frame_entry_name(k: usize, width: usize) -> String {
    format!("frame_{:0width$}.png", k, width = width)
}

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, OutputError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageOutputFormat::Png)?;
    Ok(buf.into_inner())
}

/// Build a deflate-compressed ZIP with one PNG per numbered frame.
///
/// Entry names are padded to the width of the largest frame number, so
/// their lexical order matches frame order.
///
/// # Arguments
///
/// * `frames` - `(frame number, bitmap)` pairs, written in the given order
pub fn encode_png_zip(frames: &[(usize, RgbaImage)]) -> Result<Vec<u8>, OutputError> {
    let Some(last) = frames.iter().map(|(k, _)| *k).max() else {
        return Err(OutputError::NoFrames);
    };
    let width = frame_digits(last);

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (k, image) in frames {
        let png = encode_png(image)?;
        zip.start_file(frame_entry_name(*k, width), options)?;
        zip.write_all(&png)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Write an encoded artifact to disk, creating parent directories.
pub fn write_artifact(bytes: &[u8], path: &Path) -> Result<(), OutputError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    #[test]
    fn test_frame_entry_name() {
        assert_eq!(frame_entry_name(1, 5), "frame_00001.png");
        assert_eq!(frame_entry_name(42, 5), "frame_00042.png");
        assert_eq!(frame_entry_name(42, 6), "frame_000042.png");
    }

    #[test]
    fn test_frame_digits() {
        assert_eq!(frame_digits(0), 5);
        assert_eq!(frame_digits(3), 5);
        assert_eq!(frame_digits(99_999), 5);
        assert_eq!(frame_digits(100_000), 6);
        assert_eq!(frame_digits(1_234_567), 7);
    }

    #[test]
    fn test_names_sort_numerically_past_five_digits() {
        let width = frame_digits(100_001);
        let numbers = [9, 99_999, 100_000, 100_001];
        let names: Vec<String> = numbers.iter().map(|k| frame_entry_name(*k, width)).collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
        assert_eq!(names[1], "frame_099999.png");
    }

    #[test]
    fn test_png_zip_widens_names_for_large_frame_numbers() {
        let pixel = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let frames = vec![(99_999, pixel.clone()), (100_000, pixel)];
        let bytes = encode_png_zip(&frames).unwrap();

        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["frame_099999.png", "frame_100000.png"]);
    }

    #[test]
    fn test_encode_png_round_trip_pixels() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let bytes = encode_png(&image).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));

        let loaded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 1));
        assert_eq!(*loaded.get_pixel(1, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_png_zip_names_by_frame_number() {
        let frames = vec![
            (3, RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 255]))),
            (4, RgbaImage::from_pixel(3, 2, Rgba([2, 2, 2, 255]))),
        ];
        let bytes = encode_png_zip(&frames).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let names: Vec<String> = archive.file_names().map(String::from).collect();
        assert!(names.contains(&"frame_00003.png".to_string()));
        assert!(names.contains(&"frame_00004.png".to_string()));

        let mut entry = archive.by_name("frame_00004.png").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut png = Vec::new();
        entry.read_to_end(&mut png).unwrap();
        let image = image::load_from_memory(&png).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn test_png_zip_empty_is_error() {
        assert!(matches!(encode_png_zip(&[]), Err(OutputError::NoFrames)));
    }

    #[test]
    fn test_write_artifact_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dirs/out.gif");

        write_artifact(b"GIF89a", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"GIF89a");
    }

    #[test]
    fn test_error_display() {
        let err = OutputError::TooLarge { width: 70000, height: 5 };
        assert_eq!(err.to_string(), "canvas 70000x5 is too large to encode");
        assert_eq!(OutputError::NoFrames.to_string(), "no frames to encode");
    }
}
