use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// Writes a single frame to an image file.
pub trait ImageWriter: Send + Sync {
    /// Writes `frame` to `path`, shrinking it to fit within `max_side`
    /// pixels on its longer side when given.
    fn write(&self, path: &Path, frame: &Frame, max_side: Option<u32>) -> Result<(), BoxError>;
}
