pub mod classify_gallery_use_case;
pub mod count_faces_use_case;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod run_recorder;
