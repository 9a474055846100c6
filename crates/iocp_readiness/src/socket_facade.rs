// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::{Completion, Descriptor, OperationKey};

/// The asynchronous socket layer underneath the backend.
///
/// The facade owns the sockets and the operation buffers the operating system writes into. The
/// backend only decides when operations are needed and interprets their completions; it calls
/// back into the facade to issue the zero-byte reads that detect readability and to decode the
/// outcome of finished operations.
#[cfg_attr(test, mockall::automock)]
pub trait SocketFacade: Debug {
    /// Issues a zero-byte read on the socket, which completes once the socket has data available
    /// (or the peer closed the connection) without consuming any of it.
    ///
    /// Returns the key of the issued operation. The completion of the read must carry this key
    /// and use the descriptor as the completion key.
    ///
    /// # Errors
    ///
    /// Fails if the read could not be issued. The backend then reports the error to its caller
    /// and does not consider the read queued.
    fn queue_zero_byte_read(&mut self, descriptor: Descriptor) -> crate::Result<OperationKey>;

    /// Determines the outcome of a finished operation. Typically `completion.result()`, though
    /// the facade may consult the socket for a more precise error.
    ///
    /// # Errors
    ///
    /// Returns the error the operation finished with.
    fn operation_result(&self, descriptor: Descriptor, completion: &Completion) -> crate::Result<u32>;

    /// Releases all resources held by the facade. Called exactly once, when the backend is
    /// dropped.
    fn release(&mut self);
}
