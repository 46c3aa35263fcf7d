use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;

/// Iterator over decoded frames, in presentation order.
pub type FrameIter<'a> = Box<dyn Iterator<Item = Result<Frame, BoxError>> + 'a>;

/// Decodes a clip into ordered RGB frames.
///
/// Implementations hide container and codec details; the analysis only
/// sees [`Frame`] and [`VideoMetadata`]. A reader is opened once per clip
/// and may be driven from a worker thread, hence `Send`.
pub trait VideoReader: Send {
    /// Opens a clip and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError>;

    /// Frames in decode order. An `Err` item ends the stream.
    fn frames(&mut self) -> FrameIter<'_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
