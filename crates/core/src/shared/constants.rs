pub const DETECTOR_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const LANDMARK_MODEL_NAME: &str = "landmark_68_lite.onnx";
pub const EXPRESSION_MODEL_NAME: &str = "expression_net.onnx";
pub const AGE_GENDER_MODEL_NAME: &str = "age_gender_net.onnx";

/// Primary model host, tried first.
pub const MODEL_BASE_URL: &str =
    "https://github.com/facelens/facelens-models/releases/download/v0.1.0";

/// Mirror host, tried once the primary (with retries) is exhausted.
pub const MODEL_MIRROR_URL: &str = "https://facelens.github.io/models";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Detection cadence for live sources.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Requested camera capture format (width, height, frames per second).
pub const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 720;
pub const DEFAULT_CAPTURE_FPS: u32 = 30;
