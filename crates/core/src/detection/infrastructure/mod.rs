pub mod arcface_encoder;
pub mod onnx_face_model;
pub mod onnx_yolo_detector;
pub mod session_builder;
