// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZeroUsize;

use crate::{DEFAULT_CAPACITY, DEFAULT_DRAIN_BATCH_SIZE};

/// How a poll retrieves completions from the completion port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DrainMode {
    /// Dequeue as many completions as are available, up to the drain batch size, in one call.
    #[default]
    Batched,

    /// Dequeue exactly one completion per poll. For platforms without batched retrieval.
    Single,
}

/// Settings fixed at the time a backend is created.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use iocp_readiness::{BackendOptions, DrainMode};
///
/// let options = BackendOptions::default()
///     .with_capacity(NonZeroUsize::new(16).unwrap())
///     .with_drain_mode(DrainMode::Single);
///
/// assert_eq!(options.capacity().get(), 16);
/// ```
#[derive(Clone, Debug)]
pub struct BackendOptions {
    capacity: NonZeroUsize,
    drain_batch_size: NonZeroUsize,
    drain_mode: DrainMode,
}

impl BackendOptions {
    /// Sets the maximum number of sockets tracked at the same time. This also bounds the number
    /// of readiness reports a single poll returns.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the maximum number of completions dequeued by a single poll.
    ///
    /// The effective value is never larger than the capacity, so that every dequeued completion
    /// can be reported within the same poll.
    #[must_use]
    pub const fn with_drain_batch_size(mut self, drain_batch_size: NonZeroUsize) -> Self {
        self.drain_batch_size = drain_batch_size;
        self
    }

    /// Sets how completions are retrieved from the completion port.
    #[must_use]
    pub const fn with_drain_mode(mut self, drain_mode: DrainMode) -> Self {
        self.drain_mode = drain_mode;
        self
    }

    /// The maximum number of sockets tracked at the same time.
    #[must_use]
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// The number of completions a single poll dequeues at most.
    #[must_use]
    pub fn effective_drain_batch_size(&self) -> NonZeroUsize {
        match self.drain_mode {
            DrainMode::Batched => self.drain_batch_size.min(self.capacity),
            DrainMode::Single => NonZeroUsize::MIN,
        }
    }

    /// How completions are retrieved from the completion port.
    #[must_use]
    pub const fn drain_mode(&self) -> DrainMode {
        self.drain_mode
    }
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            drain_batch_size: DEFAULT_DRAIN_BATCH_SIZE,
            drain_mode: DrainMode::default(),
        }
    }
}
