// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Any error that may arise from the readiness backend or from the completion port beneath it.
///
/// The type includes platform-specific enum variants. To write platform-neutral code, you
/// may ignore them and handle any unrecognized variants via variant-agnostic code.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller supplied an argument the backend cannot act on, or asked for something the
    /// current state of the socket does not permit (e.g. writability on a listening socket).
    ///
    /// Also used when the socket state registry is full and a new socket cannot be tracked.
    /// No partial state change is left behind when this is returned.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The completion port could not be created. The event loop cannot start.
    #[error("failed to create completion port")]
    QueueCreation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Waiting for completions failed for a reason other than the wait timing out. Completions
    /// that were already queued remain queued and will be delivered by a later poll.
    #[error("failed to wait for completions")]
    Wait(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An asynchronous operation completed with a failure status. The status code is the raw
    /// value reported by the completion port.
    #[error("operation completed with failure status {0:#x}")]
    OperationFailed(u32),

    /// (Windows only) A Windows API returned an error result that is represented transparently.
    #[cfg(windows)]
    #[error(transparent)]
    Windows(#[from] windows::core::Error),

    /// We are forwarding an error received from the standard library's I/O APIs.
    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    /// We are forwarding an error of unknown type from an unspecified source.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A specialized `Result` for use with the readiness backend.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents the backend error as a standard I/O error.
/// This is often used when the event loop driver reports errors through `std::io` types.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::StdIo(error) => error,
            Error::InvalidArgument(_) => Self::new(std::io::ErrorKind::InvalidInput, value),
            _ => Self::other(value),
        }
    }
}
