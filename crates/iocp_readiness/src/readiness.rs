// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bitflags::bitflags;
use derive_more::Display;

/// Identifies a socket watched by the backend.
///
/// On Windows this is the raw `SOCKET` value. The same value is used as the completion key of
/// every completion that belongs to the socket, so it must never equal `INVALID_SOCKET`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{_0}")]
pub struct Descriptor(pub usize);

impl From<usize> for Descriptor {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

bitflags! {
    /// The kinds of readiness an event loop can ask about and be told about.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Readiness: u8 {
        /// The socket has data to read (or, for a listening socket, a connection to accept).
        const READABLE = 0b01;
        /// The socket can accept more outgoing data.
        const WRITABLE = 0b10;
    }
}

/// A readiness report produced by a poll: the socket and the kind of readiness observed.
///
/// The readiness mask is never empty.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FiredEvent {
    descriptor: Descriptor,
    readiness: Readiness,
}

impl FiredEvent {
    pub(crate) const fn new(descriptor: Descriptor, readiness: Readiness) -> Self {
        Self {
            descriptor,
            readiness,
        }
    }

    /// The socket that became ready.
    #[must_use]
    pub const fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    /// What the socket became ready for.
    #[must_use]
    pub const fn readiness(&self) -> Readiness {
        self.readiness
    }
}

impl From<FiredEvent> for (Descriptor, Readiness) {
    fn from(value: FiredEvent) -> Self {
        (value.descriptor, value.readiness)
    }
}
