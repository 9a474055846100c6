// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZeroUsize;

/// Descriptive name of the backend, reported to the event loop for diagnostics.
pub const BACKEND_NAME: &str = "winsock_IOCP";

/// Default maximum number of sockets a single backend instance tracks at the same time.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(10_240).unwrap();

/// Default maximum number of completions dequeued from the completion port by one poll.
pub const DEFAULT_DRAIN_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Completion key reserved for wake-up signals. This is `INVALID_SOCKET`, so it never collides
/// with the completion key of a real socket.
pub(crate) const WAKE_UP_COMPLETION_KEY: usize = usize::MAX;
