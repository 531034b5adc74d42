//! Error taxonomy for the classification pipeline

use thiserror::Error;

/// Retrieving the source image failed (network, HTTP status, content type, size)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Image download failed, status code: {0}")]
    Status(u16),

    #[error("URL content is not an image, Content-Type: {0}")]
    NotAnImage(String),

    #[error("Image exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// Any transport level fault: bad URL, DNS, TLS, timeout, reset
    #[error("Image download or open failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// The fetched bytes are not a usable bitmap
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to decode image: {0}")]
    Malformed(String),

    #[error("Decoded image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Numeric or runtime failure while evaluating the model
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference failed: non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Inference failed: expected {expected} class scores, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("Inference failed: {0}")]
    Runtime(String),
}

impl From<ort::Error> for InferenceError {
    fn from(err: ort::Error) -> Self {
        InferenceError::Runtime(err.to_string())
    }
}

/// Label table and model disagree. Never a per-request condition.
#[derive(Debug, Error)]
#[error("Configuration error: label table has {labels} entries but the model produces {classes} classes")]
pub struct ConfigurationError {
    pub labels: usize,
    pub classes: usize,
}

/// Failure of a single `predict` call
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl PipelineError {
    /// Fatal errors indicate a broken deployment rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Configuration(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Decode(_) => "decode",
            PipelineError::Inference(_) => "inference",
            PipelineError::Configuration(_) => "configuration",
        }
    }
}

/// Failure while bringing the pipeline up. The process must not serve after this.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load label table from {source_name}: {message}")]
    Labels {
        source_name: String,
        message: String,
    },

    #[error("Failed to load model {path}: {message}")]
    Model { path: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
