//! Error types shared across the run orchestration.

/// Result type for run operations
pub type VisionResult<T> = Result<T, VisionError>;

/// Error types for run operations
#[derive(Debug)]
pub enum VisionError {
    /// Error from the browser driver (launch, navigation, capture)
    Browser(String),

    /// Configuration or suite-file error
    Config(String),

    /// Image decode/encode error
    Image(image::ImageError),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for VisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionError::Browser(msg) => write!(f, "Browser error: {}", msg),
            VisionError::Config(msg) => write!(f, "Config error: {}", msg),
            VisionError::Image(err) => write!(f, "Image error: {}", err),
            VisionError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for VisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VisionError::Browser(_) => None,
            VisionError::Config(_) => None,
            VisionError::Image(err) => Some(err),
            VisionError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for VisionError {
    fn from(err: std::io::Error) -> Self {
        VisionError::Io(err)
    }
}

impl From<image::ImageError> for VisionError {
    fn from(err: image::ImageError) -> Self {
        VisionError::Image(err)
    }
}

impl From<serde_json::Error> for VisionError {
    fn from(err: serde_json::Error) -> Self {
        VisionError::Config(err.to_string())
    }
}
