//! GIF animation encoding

use crate::output::OutputError;
use gif::{DisposalMethod, Encoder, Frame, Repeat};
use image::{imageops, Rgb, Rgba, RgbaImage};
use std::borrow::Cow;

/// Lowest frame rate honored; slower requests are raised to this
pub const MIN_FPS: f64 = 0.1;

/// NeuQuant sampling factor (1 = best quality, 30 = fastest)
const QUANTIZE_SPEED: i32 = 10;

/// Per-frame delay in centiseconds for a frame rate.
///
/// The millisecond delay is `round(1000 / fps)`; GIF stores hundredths of a
/// second, so it is rounded again and never drops below 1.
pub fn frame_delay_cs(fps: f64) -> u16 {
    let fps = if fps.is_finite() { fps.max(MIN_FPS) } else { MIN_FPS };
    let ms = (1000.0 / fps).round();
    ((ms / 10.0).round() as u16).max(1)
}

/// Place a frame on a `width x height` canvas filled with `fill`.
fn pad_to(frame: &RgbaImage, width: u32, height: u32, fill: Rgba<u8>) -> Cow<'_, RgbaImage> {
    if frame.dimensions() == (width, height) {
        return Cow::Borrowed(frame);
    }
    let mut canvas = RgbaImage::from_pixel(width, height, fill);
    imageops::replace(&mut canvas, frame, 0, 0);
    Cow::Owned(canvas)
}

/// Encode frames as an infinitely looping animated GIF.
///
/// Frames of different sizes are padded to the largest width and height
/// with `fill`. Each frame gets its own adaptive palette and is disposed to
/// the background before the next one is drawn.
///
/// # Examples
///
/// ```
/// use framelog::gif::encode_gif;
/// use image::{Rgb, Rgba, RgbaImage};
///
/// let frames = vec![RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]))];
/// let bytes = encode_gif(&frames, 2.0, Rgb([17, 17, 17])).unwrap();
/// assert!(bytes.starts_with(b"GIF89a"));
/// ```
pub fn encode_gif(frames: &[RgbaImage], fps: f64, fill: Rgb<u8>) -> Result<Vec<u8>, OutputError> {
    if frames.is_empty() {
        return Err(OutputError::NoFrames);
    }

    let width = frames.iter().map(RgbaImage::width).max().unwrap_or(1);
    let height = frames.iter().map(RgbaImage::height).max().unwrap_or(1);
    let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(OutputError::TooLarge { width, height }),
    };

    let fill = Rgba([fill[0], fill[1], fill[2], 255]);
    let delay = frame_delay_cs(fps);

    let mut bytes = Vec::new();
    {
        let mut encoder = Encoder::new(&mut bytes, w, h, &[])?;
        encoder.set_repeat(Repeat::Infinite)?;

        for image in frames {
            let mut pixels = pad_to(image, width, height, fill).into_owned().into_raw();
            let mut frame = Frame::from_rgba_speed(w, h, &mut pixels, QUANTIZE_SPEED);
            frame.delay = delay;
            frame.dispose = DisposalMethod::Background;
            encoder.write_frame(&frame)?;
        }
    }

    Ok(bytes)
}
