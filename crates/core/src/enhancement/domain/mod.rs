pub mod frame_enhancer;
