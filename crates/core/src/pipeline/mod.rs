pub mod analysis_logger;
pub mod analysis_state;
pub mod analyze_liveness_use_case;
pub mod diagnostic_sampler;
pub mod frame_processor;
pub mod frame_stage;
pub mod infrastructure;
pub mod liveness_error;
