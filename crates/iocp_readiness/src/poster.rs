// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::pal::{self, CompletionPosterFacade};
use crate::{Completion, Descriptor, OperationKey};

/// Posts completions to the completion port of an [`IocpBackend`][1], from any thread.
///
/// The asynchronous socket facade uses this to deliver completions of operations it finished
/// itself, and the event loop driver uses it to wake up a thread blocked in [`poll()`][2] when
/// it has created some non-I/O work for that thread to do.
///
/// You can clone the poster to share it between many callers or threads.
///
/// # Lifecycle
///
/// It is legal to use this object even after the backend it came from has been dropped. Posts
/// issued in this state have no observable effect, though the completion port stays allocated
/// until the last poster is dropped.
///
/// # Thread safety
///
/// This type is thread-safe.
///
/// [1]: crate::IocpBackend
/// [2]: crate::IocpBackend::poll
#[derive(Debug, Clone)]
pub struct CompletionPoster {
    inner: CompletionPosterFacade,
}

impl CompletionPoster {
    pub(crate) const fn new(inner: CompletionPosterFacade) -> Self {
        Self { inner }
    }

    /// Queues a completion, to be dequeued by a current or upcoming poll.
    ///
    /// # Errors
    ///
    /// Fails if the operating system refuses to queue the completion.
    pub fn post(&self, completion: Completion) -> crate::Result<()> {
        pal::CompletionPoster::post(&self.inner, completion)
    }

    /// Queues a successful completion of `operation` on the socket `descriptor`.
    ///
    /// # Errors
    ///
    /// Fails if the operating system refuses to queue the completion.
    pub fn complete(
        &self,
        descriptor: Descriptor,
        operation: OperationKey,
        bytes_transferred: u32,
    ) -> crate::Result<()> {
        self.post(Completion::new(descriptor, operation, bytes_transferred))
    }

    /// Wakes up the polling thread, either from an ongoing or an upcoming wait for completions.
    /// The poll that consumes the signal reports nothing for it.
    ///
    /// # Errors
    ///
    /// Fails if the operating system refuses to queue the wake-up signal.
    pub fn wake(&self) -> crate::Result<()> {
        self.post(Completion::wake_up())
    }
}
