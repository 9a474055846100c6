// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::num::NonZeroUsize;

use crate::{Descriptor, SocketState};

/// The state of every socket the backend currently watches, keyed by descriptor.
///
/// # Thread safety
///
/// This is a single-threaded type, only meant to be accessed from the thread that polls the
/// backend.
#[derive(Debug)]
pub struct SocketRegistry {
    sockets: HashMap<Descriptor, SocketState>,
    capacity: NonZeroUsize,
}

impl SocketRegistry {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            sockets: HashMap::new(),
            capacity,
        }
    }

    /// Returns the state of the socket, creating it if this is the first reference to the socket.
    ///
    /// Returns `None` if the socket is new and the registry is already tracking as many sockets
    /// as its capacity allows.
    pub(crate) fn get_or_create(&mut self, descriptor: Descriptor) -> Option<&mut SocketState> {
        let is_full = self.sockets.len() >= self.capacity.get();

        match self.sockets.entry(descriptor) {
            Entry::Occupied(entry) => Some(entry.into_mut()),
            Entry::Vacant(_) if is_full => None,
            Entry::Vacant(entry) => Some(entry.insert(SocketState::new(descriptor))),
        }
    }

    pub(crate) fn get(&self, descriptor: Descriptor) -> Option<&SocketState> {
        self.sockets.get(&descriptor)
    }

    pub(crate) fn get_mut(&mut self, descriptor: Descriptor) -> Option<&mut SocketState> {
        self.sockets.get_mut(&descriptor)
    }

    /// No-op if the socket is not tracked.
    pub(crate) fn remove(&mut self, descriptor: Descriptor) -> Option<SocketState> {
        self.sockets.remove(&descriptor)
    }

    /// Deletes the state of the socket if nothing refers to it anymore.
    /// Returns whether it was deleted.
    pub(crate) fn remove_if_reclaimable(&mut self, descriptor: Descriptor) -> bool {
        let reclaimable = self
            .sockets
            .get(&descriptor)
            .is_some_and(SocketState::is_reclaimable);

        if reclaimable {
            self.sockets.remove(&descriptor);
        }

        reclaimable
    }

    pub(crate) fn len(&self) -> usize {
        self.sockets.len()
    }
}
