use thiserror::Error;

/// Errors from the content-hash utility.
#[derive(Debug, Error)]
pub enum HashError {
    /// The payload could not be converted to a JSON value.
    #[error("payload is not JSON-representable: {0}")]
    Encoding(#[from] serde_json::Error),
}
