// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;

use bitflags::bitflags;

use crate::{AcceptedConnection, Descriptor, OperationKey, Readiness};

bitflags! {
    /// Backend bookkeeping about a socket, independent of what the event loop is interested in.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct SocketFlags: u8 {
        /// A zero-byte read is in flight.
        const READ_QUEUED = 0b0001;
        /// The socket accepts connections. Its readiness comes from finished accepts only.
        const LISTENING = 0b0010;
        /// An accept is in flight.
        const ACCEPT_PENDING = 0b0100;
        /// The facade holds the socket open, so the state outlives individual operations.
        const ATTACHED = 0b1000;
    }
}

/// What the backend knows about one watched socket.
///
/// Exists from the first time the socket is referenced until nothing can refer to it anymore:
/// no write in flight, no zero-byte read queued and not attached by the facade.
#[derive(Debug)]
pub struct SocketState {
    descriptor: Descriptor,
    interest: Readiness,
    flags: SocketFlags,
    pending_write_count: usize,
    pending_accepts: VecDeque<AcceptedConnection>,
    read_operation: Option<OperationKey>,
}

impl SocketState {
    pub(crate) fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            interest: Readiness::empty(),
            flags: SocketFlags::empty(),
            pending_write_count: 0,
            pending_accepts: VecDeque::new(),
            read_operation: None,
        }
    }

    /// The socket this state belongs to.
    #[must_use]
    pub const fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    /// The readiness the event loop asked to be told about.
    #[must_use]
    pub const fn interest(&self) -> Readiness {
        self.interest
    }

    /// Backend bookkeeping flags.
    #[must_use]
    pub const fn flags(&self) -> SocketFlags {
        self.flags
    }

    /// Number of writes (real or arming) issued on the socket that have not completed yet.
    #[must_use]
    pub const fn pending_write_count(&self) -> usize {
        self.pending_write_count
    }

    /// Number of finished accepts not yet taken by the facade.
    #[must_use]
    pub fn pending_accept_count(&self) -> usize {
        self.pending_accepts.len()
    }

    /// Whether the socket accepts connections.
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.flags.contains(SocketFlags::LISTENING)
    }

    /// Whether a zero-byte read is in flight.
    #[must_use]
    pub const fn is_read_queued(&self) -> bool {
        self.flags.contains(SocketFlags::READ_QUEUED)
    }

    /// Whether nothing can refer to this state anymore, so it may be deleted.
    #[must_use]
    pub const fn is_reclaimable(&self) -> bool {
        self.pending_write_count == 0
            && !self.flags.contains(SocketFlags::READ_QUEUED)
            && !self.flags.contains(SocketFlags::ATTACHED)
    }

    pub(crate) fn add_interest(&mut self, readiness: Readiness) {
        self.interest.insert(readiness);
    }

    pub(crate) fn remove_interest(&mut self, readiness: Readiness) {
        self.interest.remove(readiness);
    }

    pub(crate) fn insert_flags(&mut self, flags: SocketFlags) {
        self.flags.insert(flags);
    }

    pub(crate) fn remove_flags(&mut self, flags: SocketFlags) {
        self.flags.remove(flags);
    }

    pub(crate) const fn read_operation(&self) -> Option<OperationKey> {
        self.read_operation
    }

    pub(crate) fn read_queued(&mut self, operation: OperationKey) {
        self.read_operation = Some(operation);
        self.flags.insert(SocketFlags::READ_QUEUED);
    }

    /// Returns whether `operation` was the queued read, in which case the read is no longer queued.
    pub(crate) fn read_completed(&mut self, operation: OperationKey) -> bool {
        if self.is_read_queued() && self.read_operation == Some(operation) {
            self.read_operation = None;
            self.flags.remove(SocketFlags::READ_QUEUED);
            true
        } else {
            false
        }
    }

    pub(crate) fn write_started(&mut self) {
        self.pending_write_count = self.pending_write_count.saturating_add(1);
    }

    /// Returns the number of writes still in flight.
    pub(crate) fn write_completed(&mut self) -> usize {
        debug_assert!(self.pending_write_count > 0, "write completed but none was in flight");
        self.pending_write_count = self.pending_write_count.saturating_sub(1);
        self.pending_write_count
    }

    pub(crate) fn accept_completed(&mut self, accepted: AcceptedConnection) {
        self.pending_accepts.push_back(accepted);
        self.flags.remove(SocketFlags::ACCEPT_PENDING);
    }

    pub(crate) fn take_accepted(&mut self) -> Option<AcceptedConnection> {
        self.pending_accepts.pop_front()
    }
}
