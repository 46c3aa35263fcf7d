pub mod adaptive_frame_enhancer;
mod clahe;
mod gaussian;
