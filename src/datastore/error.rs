use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("datastore request failed: {message}")]
    Request { message: String },
    #[error("datastore returned status {status}")]
    Status { status: u16 },
}
