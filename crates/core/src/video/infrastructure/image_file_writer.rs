use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::BoxError;
use crate::video::domain::image_writer::ImageWriter;

/// Saves frames with the `image` crate; the format follows the extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Dimensions scaled so the longer side is at most `max_side`.
fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame, max_side: Option<u32>) -> Result<(), BoxError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if frame.channels() != 3 {
            return Err(format!("expected an RGB frame, got {} channel(s)", frame.channels()).into());
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame buffer does not match its dimensions")?;

        let img = match max_side {
            Some(side) => {
                let (w, h) = fit_within(img.width(), img.height(), side);
                if (w, h) == img.dimensions() {
                    img
                } else {
                    image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
                }
            }
            None => img,
        };

        img.save(path)?;
        Ok(())
    }
}
