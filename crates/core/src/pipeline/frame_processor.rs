use crate::pipeline::frame_stage::{FrameStage, ProcessedFrame};
use crate::shared::BoxError;
use crate::video::domain::video_reader::VideoReader;

/// Predicate choosing which frames keep their enhanced raster.
pub type KeepFrameFn = dyn Fn(usize) -> bool + Sync;

/// Runs the per-frame stage over a whole clip.
///
/// Implementations may process frames concurrently but must hand them to
/// `sink` in frame order. Returns the number of frames decoded; a decode
/// error aborts the run.
pub trait FrameProcessor: Send + Sync {
    fn process(
        &self,
        reader: &mut dyn VideoReader,
        stage: &FrameStage,
        keep_enhanced: &KeepFrameFn,
        sink: &mut dyn FnMut(ProcessedFrame),
    ) -> Result<usize, BoxError>;
}

/// Processes frames one at a time on the calling thread.
pub struct SequentialFrameProcessor;

impl FrameProcessor for SequentialFrameProcessor {
    fn process(
        &self,
        reader: &mut dyn VideoReader,
        stage: &FrameStage,
        keep_enhanced: &KeepFrameFn,
        sink: &mut dyn FnMut(ProcessedFrame),
    ) -> Result<usize, BoxError> {
        let mut decoded = 0;
        for item in reader.frames() {
            let frame = item?;
            let keep = keep_enhanced(frame.index());
            sink(stage.process(frame, keep));
            decoded += 1;
        }
        Ok(decoded)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::shared::BoxError;
    use crate::video::domain::video_reader::{FrameIter, VideoReader};

    /// In-memory clip of small portrait frames, optionally failing at
    /// `fail_at`.
    pub struct StubReader {
        pub frame_count: usize,
        pub fps: f64,
        pub fail_at: Option<usize>,
        pub fail_open: bool,
        pub closed: bool,
    }

    impl StubReader {
        pub fn new(frame_count: usize) -> Self {
            Self {
                frame_count,
                fps: 30.0,
                fail_at: None,
                fail_open: false,
                closed: false,
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
            if self.fail_open {
                return Err("moov atom not found".into());
            }
            Ok(VideoMetadata {
                width: 4,
                height: 6,
                fps: self.fps,
                total_frames: self.frame_count,
                codec: "stub".into(),
                source_path: Some(path.to_path_buf()),
                container_rotation: 0,
            })
        }

        fn frames(&mut self) -> FrameIter<'_> {
            let fail_at = self.fail_at;
            Box::new((0..self.frame_count).map_while(move |i| {
                if fail_at.is_some_and(|f| i > f) {
                    return None;
                }
                if fail_at == Some(i) {
                    return Some(Err("corrupt packet".into()));
                }
                Some(Ok(Frame::new(vec![90u8; 4 * 6 * 3], 4, 6, 3, i)))
            }))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }
}
