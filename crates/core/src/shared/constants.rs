pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Two signatures belong to the same person when their cosine distance is at
/// or below this value.
pub const MATCH_DISTANCE_THRESHOLD: f64 = 0.6;

/// Default detector confidence for the ONNX face model.
pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

/// Default wall-clock budget for one classification request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Application directory name under the platform data/cache directories.
pub const APP_DIR_NAME: &str = "FindMe";
