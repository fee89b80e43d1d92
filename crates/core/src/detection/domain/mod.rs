pub mod face_model;
pub mod face_model_adapter;
pub mod face_signature;
