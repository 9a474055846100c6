// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{Level, event};

use crate::DrainMode;
use crate::pal::{Completion, CompletionPort, CompletionPosterFacade, CompletionPosterImpl};

/// Completion notifications waiting to be dequeued, shared between the port and its posters.
#[derive(Debug, Default)]
pub struct SharedQueue {
    entries: Mutex<VecDeque<Completion>>,
    available: Condvar,
}

impl SharedQueue {
    pub(crate) fn push(&self, completion: Completion) {
        self.entries.lock().push_back(completion);
        self.available.notify_one();
    }
}

/// Implements the completion port concept with an in-process queue.
#[derive(Debug)]
pub struct CompletionPortImpl {
    queue: Arc<SharedQueue>,
}

impl CompletionPortImpl {
    pub(crate) fn new() -> Self {
        event!(Level::TRACE, message = "new in-process completion port");

        Self {
            queue: Arc::new(SharedQueue::default()),
        }
    }
}

impl CompletionPort for CompletionPortImpl {
    fn post(&self, completion: Completion) -> crate::Result<()> {
        self.queue.push(completion);
        Ok(())
    }

    fn dequeue(
        &mut self,
        entries: &mut Vec<Completion>,
        max_entries: usize,
        timeout: Option<Duration>,
        mode: DrainMode,
    ) -> crate::Result<()> {
        let mut pending = self.queue.entries.lock();

        match timeout {
            None => {
                while pending.is_empty() {
                    self.queue.available.wait(&mut pending);
                }
            }
            Some(timeout) => {
                // Spurious wake-ups are absorbed by waiting again for the remaining time only.
                let deadline = Instant::now().checked_add(timeout);

                while pending.is_empty() {
                    let Some(deadline) = deadline else {
                        // Too far in the future to represent, so equivalent to no deadline.
                        self.queue.available.wait(&mut pending);
                        continue;
                    };

                    if self
                        .queue
                        .available
                        .wait_until(&mut pending, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
            }
        }

        let count = match mode {
            DrainMode::Batched => pending.len().min(max_entries),
            DrainMode::Single => pending.len().min(1),
        };

        entries.extend(pending.drain(..count));

        Ok(())
    }

    fn poster(&self) -> CompletionPosterFacade {
        CompletionPosterImpl::new(Arc::clone(&self.queue)).into()
    }
}
