pub mod classification;
pub mod constants;
pub mod face_region;
pub mod gallery_image;
pub mod isolation;
pub mod model_resolver;
pub mod normalized_image;
pub mod user_id;
