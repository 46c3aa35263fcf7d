pub mod eye_landmarks;
pub mod face_detection;
pub mod landmark_provider;
pub mod orientation_resolver;
