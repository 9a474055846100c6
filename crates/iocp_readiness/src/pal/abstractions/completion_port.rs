// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::time::Duration;

use crate::DrainMode;
use crate::pal::{Completion, CompletionPosterFacade};

/// The single completion port shared by every socket of one backend instance.
///
/// Sockets are associated with the port by the socket facade, using the socket itself as the
/// completion key. The backend only posts to the port and drains it.
///
/// # Ownership
///
/// Exclusively owned by the backend. The port is closed when the implementation is dropped.
///
/// # Thread safety
///
/// No thread safety is required from implementations (no `Send` or `Sync` bounds). Only the
/// poster returned by [`poster()`][CompletionPort::poster] may cross threads.
pub trait CompletionPort: Debug {
    /// Enqueues a completion that did not result from real I/O. Never blocks.
    fn post(&self, completion: Completion) -> crate::Result<()>;

    /// Dequeues completions into `entries` (which the caller has cleared), waiting for up to
    /// `timeout` when none are pending. `None` waits indefinitely.
    ///
    /// Dequeues at most `max_entries` in [`DrainMode::Batched`] and exactly one in
    /// [`DrainMode::Single`]. A wait that times out is not an error and leaves `entries` empty.
    fn dequeue(
        &mut self,
        entries: &mut Vec<Completion>,
        max_entries: usize,
        timeout: Option<Duration>,
        mode: DrainMode,
    ) -> crate::Result<()>;

    /// Creates a new poster that can enqueue completions from any thread.
    fn poster(&self) -> CompletionPosterFacade;
}
