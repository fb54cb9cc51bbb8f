use thiserror::Error;

/// Errors from the local and remote stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode or decode stored data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store rejected the request (status {status}): {message}")]
    Remote { status: u16, message: String },
}
