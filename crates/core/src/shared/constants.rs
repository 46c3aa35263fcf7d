pub const FACE_DETECTOR_MODEL_NAME: &str = "blazeface.onnx";
pub const FACE_MESH_MODEL_NAME: &str = "face_mesh.onnx";

/// Frame rate assumed when the container does not report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Below this many frames with a usable face the clip scores zero.
pub const MIN_FACE_FRAMES: usize = 10;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Upload size ceiling for a single clip (16 MiB).
pub const MAX_VIDEO_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Upper bound on the default worker count for the threaded frame stage.
pub const MAX_DEFAULT_WORKERS: usize = 8;
