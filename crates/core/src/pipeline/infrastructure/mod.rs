pub mod debug_frame_logger;
pub mod jsonl_diagnostic_logger;
pub mod threaded_frame_processor;
