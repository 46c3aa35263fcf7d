use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;
use crate::video::domain::video_reader::{FrameIter, VideoReader};

/// Reads a directory of still images as a clip.
///
/// Files with an image extension are ordered by file name and decoded
/// lazily with the `image` crate. Directories carry no timing, so the
/// frame rate is supplied by the caller.
pub struct ImageSequenceReader {
    fps: f64,
    files: Vec<PathBuf>,
    size: (u32, u32),
}

impl ImageSequenceReader {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            files: Vec::new(),
            size: (0, 0),
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, BoxError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_frame(path: &Path, index: usize, expected: (u32, u32)) -> Result<Frame, BoxError> {
    let img = image::open(path)
        .map_err(|e| format!("{}: {e}", path.display()))?
        .to_rgb8();
    if img.dimensions() != expected {
        return Err(format!(
            "{}: size {}x{} differs from first frame {}x{}",
            path.display(),
            img.width(),
            img.height(),
            expected.0,
            expected.1
        )
        .into());
    }
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index))
}

impl VideoReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
        if !path.is_dir() {
            return Err(format!("{} is not a directory", path.display()).into());
        }
        let files = list_images(path)?;
        let first = files
            .first()
            .ok_or_else(|| format!("no images found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| format!("{}: {e}", first.display()))?;

        log::debug!(
            "Opened image sequence {}: {} frame(s) at {}x{}",
            path.display(),
            files.len(),
            width,
            height
        );

        let metadata = VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: files.len(),
            codec: "image-sequence".to_string(),
            source_path: Some(path.to_path_buf()),
            container_rotation: 0,
        };
        self.files = files;
        self.size = (width, height);
        Ok(metadata)
    }

    fn frames(&mut self) -> FrameIter<'_> {
        if self.files.is_empty() {
            return Box::new(std::iter::once(Err("ImageSequenceReader: not opened".into())));
        }
        let size = self.size;
        let mut failed = false;
        Box::new(
            self.files
                .iter()
                .enumerate()
                .map_while(move |(i, path)| {
                    if failed {
                        return None;
                    }
                    let frame = load_frame(path, i, size);
                    failed = frame.is_err();
                    Some(frame)
                }),
        )
    }

    fn close(&mut self) {
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, level: u8, width: u32, height: u32) {
        image::RgbImage::from_pixel(width, height, image::Rgb([level, level, level]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_frames_follow_file_name_order() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "frame_002.png", 200, 8, 6);
        write_png(dir.path(), "frame_000.png", 0, 8, 6);
        write_png(dir.path(), "frame_001.png", 100, 8, 6);

        let mut reader = ImageSequenceReader::new(15.0);
        let meta = reader.open(dir.path()).unwrap();
        assert_eq!((meta.width, meta.height), (8, 6));
        assert_eq!(meta.total_frames, 3);
        assert_eq!(meta.fps, 15.0);

        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();
        let levels: Vec<u8> = frames.iter().map(|f| f.data()[0]).collect();
        assert_eq!(levels, vec![0, 100, 200]);
        assert_eq!(frames[2].index(), 2);
    }

    #[test]
    fn test_non_image_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "a.png", 10, 4, 4);
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let mut reader = ImageSequenceReader::new(30.0);
        assert_eq!(reader.open(dir.path()).unwrap().total_frames, 1);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ImageSequenceReader::new(30.0).open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no images"));
    }

    #[test]
    fn test_file_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "a.png", 10, 4, 4);
        assert!(ImageSequenceReader::new(30.0)
            .open(&dir.path().join("a.png"))
            .is_err());
    }

    #[test]
    fn test_mismatched_size_stops_the_stream() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "0.png", 10, 4, 4);
        write_png(dir.path(), "1.png", 10, 8, 8);
        write_png(dir.path(), "2.png", 10, 4, 4);

        let mut reader = ImageSequenceReader::new(30.0);
        reader.open(dir.path()).unwrap();
        let items: Vec<_> = reader.frames().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_frames_before_open_is_an_error() {
        let mut reader = ImageSequenceReader::new(30.0);
        assert!(reader.frames().next().unwrap().is_err());
    }
}
