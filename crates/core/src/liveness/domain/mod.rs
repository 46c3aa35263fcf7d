pub mod acceptance_policy;
pub mod blink_detector;
pub mod distribution_analyzer;
pub mod ear_sample;
pub mod liveness_config;
pub mod liveness_result;
pub mod score_aggregator;
