use thiserror::Error;

/// Failures of the upload and lookup operations.
///
/// Every variant reaches the caller the same way (HTTP 400 with the message
/// embedded); the variants exist for logs and metrics.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("{0}")]
    Validation(String),

    #[error("illegal base64 data: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to store image: {0}")]
    Storage(String),

    /// The blob at `object_key` was written and is left orphaned.
    #[error("failed to save image record: {cause}")]
    Persistence { object_key: String, cause: String },

    #[error("failed to query images: {0}")]
    Query(String),
}

impl ImageError {
    /// Stable name used as a log field and metric label
    pub fn kind(&self) -> &'static str {
        match self {
            ImageError::Validation(_) => "validation",
            ImageError::Decode(_) => "decode",
            ImageError::Storage(_) => "storage",
            ImageError::Persistence { .. } => "persistence",
            ImageError::Query(_) => "query",
        }
    }

    /// Key of a blob left behind without a database record, if any
    pub fn orphaned_object(&self) -> Option<&str> {
        match self {
            ImageError::Persistence { object_key, .. } => Some(object_key),
            _ => None,
        }
    }
}
