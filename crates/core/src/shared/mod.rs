pub mod bounding_box;
pub mod constants;
pub mod frame;
pub mod rotation;
pub mod video_metadata;

/// Error type at trait seams where backends fail in backend-specific ways.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
