// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::OperationKey;

/// The outcome of a finished accept on a listening socket, waiting to be taken by the facade.
#[derive(Debug)]
pub struct AcceptedConnection {
    operation: OperationKey,
    result: crate::Result<u32>,
}

impl AcceptedConnection {
    pub(crate) const fn new(operation: OperationKey, result: crate::Result<u32>) -> Self {
        Self { operation, result }
    }

    /// The accept operation that finished. The facade uses this to find the accepted socket.
    #[must_use]
    pub const fn operation(&self) -> OperationKey {
        self.operation
    }

    /// Whether the accept succeeded, with the number of bytes received together with the
    /// connection on success.
    #[must_use]
    pub const fn result(&self) -> &crate::Result<u32> {
        &self.result
    }

    /// Consumes the record, returning the operation key and the outcome.
    #[must_use]
    pub fn into_parts(self) -> (OperationKey, crate::Result<u32>) {
        (self.operation, self.result)
    }
}
