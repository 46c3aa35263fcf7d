pub mod detection;
pub mod enhancement;
pub mod liveness;
pub mod pipeline;
pub mod shared;
pub mod video;
