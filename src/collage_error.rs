use warp::http::StatusCode;

use crate::layout::LayoutError;

#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("No photo or photo_url provided")]
    MissingInput,
    #[error("Failed to download image from URL: {0}")]
    RemoteFetchFailure(String),
    #[error("Expected {expected} photos, got {actual}")]
    InvalidPhotoCount { expected: String, actual: usize },
    #[error("Invalid value for field '{field}': {value}")]
    InvalidField { field: String, value: String },
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("Not found")]
    NotFound,
    #[error("Asset missing or unreadable: {0}")]
    AssetMissing(String),
    #[error("Failed to store result: {0}")]
    StorageFailure(String),
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Processing failed: {0}")]
    Processing(String),
}

impl CollageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CollageError::MissingInput
            | CollageError::RemoteFetchFailure(_)
            | CollageError::InvalidPhotoCount { .. }
            | CollageError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            CollageError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            CollageError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CollageError::NotFound => StatusCode::NOT_FOUND,
            CollageError::AssetMissing(_)
            | CollageError::StorageFailure(_)
            | CollageError::Layout(_)
            | CollageError::Image(_)
            | CollageError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type CollageResult<T> = Result<T, CollageError>;
