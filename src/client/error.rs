use thiserror::Error;

/// Cloneable so one refresh outcome can be handed to every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    /// Terminal: the stored tokens were discarded and credentials are needed.
    #[error("session expired, please log in again")]
    ReauthenticationRequired,
    #[error("unexpected response body: {0}")]
    Decode(String),
}
