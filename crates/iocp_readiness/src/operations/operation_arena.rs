// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;

use crate::{Descriptor, OperationKey, OperationRequest};

/// The in-flight operations of a backend, keyed by the operation key their completion carries.
#[derive(Debug, Default)]
pub struct OperationArena {
    operations: HashMap<OperationKey, OperationRequest>,

    // Source of keys for operations the backend posts itself.
    next_synthetic: usize,
}

impl OperationArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates a key for an operation that never reaches the operating system. Synthetic keys
    /// are odd, so they can never equal the (aligned) address of a real operation. Keys still in
    /// flight are skipped.
    pub(crate) fn next_synthetic_key(&mut self) -> OperationKey {
        loop {
            let key = OperationKey((self.next_synthetic << 1) | 1);
            self.next_synthetic = self.next_synthetic.wrapping_add(1) & (usize::MAX >> 1);

            if !self.operations.contains_key(&key) {
                return key;
            }
        }
    }

    /// Whether the key belongs to the range reserved for [synthetic operations][1].
    ///
    /// [1]: Self::next_synthetic_key
    pub(crate) const fn is_synthetic(key: OperationKey) -> bool {
        key.0 & 1 == 1
    }

    /// Returns `false` without inserting if an operation with the same key is already in flight.
    pub(crate) fn insert(&mut self, key: OperationKey, request: OperationRequest) -> bool {
        if self.operations.contains_key(&key) {
            return false;
        }

        self.operations.insert(key, request);
        true
    }

    pub(crate) fn remove(&mut self, key: OperationKey) -> Option<OperationRequest> {
        self.operations.remove(&key)
    }

    /// Removes the operation only if it was issued on `descriptor`. An operation issued on another
    /// socket stays in flight and `Err` carries the socket it belongs to.
    pub(crate) fn remove_issued_on(
        &mut self,
        descriptor: Descriptor,
        key: OperationKey,
    ) -> Result<Option<OperationRequest>, Descriptor> {
        match self.operations.get(&key) {
            None => Ok(None),
            Some(request) if request.descriptor() != descriptor => Err(request.descriptor()),
            Some(_) => Ok(self.operations.remove(&key)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.operations.len()
    }
}
