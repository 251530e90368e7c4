#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown job status: {0}")]
    UnknownJobState(String),

    #[error("Malformed job status: {0}")]
    MalformedStatus(String),
}
