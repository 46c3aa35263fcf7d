pub mod cached_landmark_provider;
pub mod execution_provider;
pub mod math;
pub mod model_resolver;
pub mod onnx_blazeface_detector;
pub mod onnx_face_mesh;
pub mod onnx_landmark_provider;
