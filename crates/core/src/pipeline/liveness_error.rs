use std::path::PathBuf;

use thiserror::Error;

use crate::detection::infrastructure::model_resolver::ModelResolveError;
use crate::liveness::domain::liveness_config::ConfigError;
use crate::shared::BoxError;

/// Hard failures of an analysis. Low face coverage and per-frame landmark
/// failures are not errors; they degrade the result instead.
#[derive(Error, Debug)]
pub enum LivenessError {
    #[error("cannot decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model error: {0}")]
    Model(#[source] BoxError),
}

impl From<ModelResolveError> for LivenessError {
    fn from(e: ModelResolveError) -> Self {
        LivenessError::Model(Box::new(e))
    }
}

impl LivenessError {
    pub(crate) fn decode(path: &std::path::Path, message: impl ToString) -> Self {
        LivenessError::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}
