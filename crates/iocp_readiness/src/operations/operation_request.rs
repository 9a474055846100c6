// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::Descriptor;

/// Invoked once when a write issued through the backend finishes, with the socket and the
/// outcome of the write (number of bytes written on success).
pub type WriteContinuation = Box<dyn FnOnce(Descriptor, crate::Result<u32>)>;

/// What an in-flight operation is for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind {
    /// A write, either real (issued by the facade) or a synthetic one that arms writability.
    Write,

    /// An accept on a listening socket.
    Accept,
}

/// An in-flight write or accept the backend is waiting for the completion of.
pub struct OperationRequest {
    kind: OperationKind,
    descriptor: Descriptor,
    continuation: Option<WriteContinuation>,
}

impl OperationRequest {
    pub(crate) fn write(descriptor: Descriptor, continuation: Option<WriteContinuation>) -> Self {
        Self {
            kind: OperationKind::Write,
            descriptor,
            continuation,
        }
    }

    pub(crate) const fn accept(descriptor: Descriptor) -> Self {
        Self {
            kind: OperationKind::Accept,
            descriptor,
            continuation: None,
        }
    }

    /// What the operation is for.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The socket the operation was issued on.
    #[must_use]
    pub const fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    /// Invokes the continuation of a finished write, if there is one, with the outcome produced
    /// by `result`. The outcome is only determined if someone is interested in it. The request is
    /// consumed, so the continuation can never run twice.
    pub(crate) fn complete(self, result: impl FnOnce() -> crate::Result<u32>) {
        if let Some(continuation) = self.continuation {
            continuation(self.descriptor, result());
        }
    }
}

impl Debug for OperationRequest {
    #[cfg_attr(test, mutants::skip)] // There is no API contract this needs to satisfy.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRequest")
            .field("kind", &self.kind)
            .field("descriptor", &self.descriptor)
            .field("has_continuation", &self.continuation.is_some())
            .finish()
    }
}
