// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constants::WAKE_UP_COMPLETION_KEY;
use crate::{Descriptor, Error};

/// Identifies one asynchronous operation in the completion notifications the operating system
/// delivers for it.
///
/// On Windows this is the address of the operation's `OVERLAPPED` structure. Operations posted
/// by the backend itself (which the operating system never dereferences) use odd values, which
/// can never be the address of an `OVERLAPPED`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OperationKey(pub usize);

/// A platform-neutral copy of one completion notification dequeued from the completion port.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Completion {
    completion_key: usize,
    operation: OperationKey,
    bytes_transferred: u32,
    status: u32,
}

impl Completion {
    /// A successful completion of `operation` on the socket identified by `descriptor`.
    #[must_use]
    pub const fn new(descriptor: Descriptor, operation: OperationKey, bytes_transferred: u32) -> Self {
        Self {
            completion_key: descriptor.0,
            operation,
            bytes_transferred,
            status: 0,
        }
    }

    /// A completion of `operation` that finished with the given (non-zero) failure status.
    #[must_use]
    pub const fn failed(descriptor: Descriptor, operation: OperationKey, status: u32) -> Self {
        Self {
            completion_key: descriptor.0,
            operation,
            bytes_transferred: 0,
            status,
        }
    }

    /// A wake-up signal. It refers to no socket and no operation.
    #[must_use]
    pub const fn wake_up() -> Self {
        Self {
            completion_key: WAKE_UP_COMPLETION_KEY,
            operation: OperationKey(0),
            bytes_transferred: 0,
            status: 0,
        }
    }

    pub(crate) const fn from_raw(
        completion_key: usize,
        operation: OperationKey,
        bytes_transferred: u32,
        status: u32,
    ) -> Self {
        Self {
            completion_key,
            operation,
            bytes_transferred,
            status,
        }
    }

    /// Whether this is a wake-up signal rather than the completion of an operation.
    #[must_use]
    pub const fn is_wake_up_signal(&self) -> bool {
        self.completion_key == WAKE_UP_COMPLETION_KEY
    }

    /// The socket the completed operation was issued on.
    #[must_use]
    pub const fn descriptor(&self) -> Descriptor {
        Descriptor(self.completion_key)
    }

    pub(crate) const fn completion_key(&self) -> usize {
        self.completion_key
    }

    /// The operation that completed.
    #[must_use]
    pub const fn operation(&self) -> OperationKey {
        self.operation
    }

    /// The number of bytes the operation transferred, as reported by the completion port.
    #[must_use]
    pub const fn bytes_transferred(&self) -> u32 {
        self.bytes_transferred
    }

    /// The raw status reported by the completion port. Zero means success.
    #[must_use]
    pub const fn status(&self) -> u32 {
        self.status
    }

    /// The outcome of the operation, indicating number of bytes transferred on success.
    pub fn result(&self) -> crate::Result<u32> {
        if self.status == 0 {
            Ok(self.bytes_transferred)
        } else {
            Err(Error::OperationFailed(self.status))
        }
    }
}
