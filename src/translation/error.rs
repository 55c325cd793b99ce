use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("chat stream request failed: {message}")]
    Request { message: String },
    #[error("model not found: {model}")]
    ModelNotFound { model: String },
    #[error("upstream returned status {status}")]
    Status { status: u16 },
    #[error("translation timed out after {0:?}")]
    Timeout(Duration),
    #[error("no translation produced")]
    Empty,
    #[error("translation consumer went away")]
    Canceled,
}
