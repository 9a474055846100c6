// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::pal::Completion;

/// Enqueues completions into a completion port from any thread.
///
/// Instances may be cloned and moved to any thread and may outlive the completion port they are
/// associated with.
pub trait CompletionPoster: Clone + Debug + Send + 'static {
    /// Enqueues the completion, to be dequeued by an ongoing or upcoming poll.
    fn post(&self, completion: Completion) -> crate::Result<()>;
}
