//! Errors for the host bridge.

/// Failures of the stdio transport itself. Event handling never produces
/// these; handler errors are folded into outcomes.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("ENCODE_FAILED: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("WRITER_FAILED: {0}")]
    Writer(String),
}
