//! Error types for the controller side

use thiserror::Error;

/// Result type for controller-side operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Controller-side errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The worker side of the channel is gone
    #[error("Worker channel closed")]
    ChannelClosed,
}
