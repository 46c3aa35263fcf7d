use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::Session;

use crate::shared::BoxError;

/// Hardware execution providers worth trying on this platform.
///
/// ONNX Runtime falls back to the CPU provider when none of them register.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Builds an inference session for `model_path` on the preferred providers.
pub fn load_session(model_path: &Path) -> Result<Session, BoxError> {
    if !model_path.exists() {
        return Err(format!("model not found at {}", model_path.display()).into());
    }
    let session = Session::builder()?
        .with_execution_providers(preferred_execution_providers())
        .map_err(|e| format!("execution providers: {e}"))?
        .commit_from_file(model_path)?;
    log::debug!("Loaded ONNX model {}", model_path.display());
    Ok(session)
}

/// Spatial input size of a square image model, read from its first input.
///
/// Returns `(size, channels_last)`; `None` when the shape is dynamic.
pub fn image_input_layout(session: &Session) -> Option<(u32, bool)> {
    let input = session.inputs().first()?;
    let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() else {
        return None;
    };
    if shape.len() < 4 {
        return None;
    }
    // NCHW has channels at 1, NHWC at 3.
    if shape[1] == 3 && shape[2] > 0 {
        Some((shape[2] as u32, false))
    } else if shape[3] == 3 && shape[1] > 0 {
        Some((shape[1] as u32, true))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_reported_before_runtime_init() {
        let err = load_session(Path::new("/nonexistent/face_mesh.onnx")).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_provider_list_matches_platform() {
        let providers = preferred_execution_providers();
        if cfg!(any(target_os = "macos", target_os = "windows")) {
            assert_eq!(providers.len(), 1);
        } else {
            assert!(providers.is_empty());
        }
    }
}
