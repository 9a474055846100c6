// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::pal::{Completion, CompletionPort, CompletionPoster, CompletionPosterFacade};
use crate::{DrainMode, Error};

pub type CompletionSource = Arc<Mutex<VecDeque<Completion>>>;

/// A simulated completion port that hands out completions from a shared queue when polled.
///
/// Designed to be used in scenarios where a mock platform is used, as simulating a completion port
/// via mockall is problematic due to the output buffer the dequeue writes into.
///
/// The simulated port never waits. Whatever is in the queue at the time of the poll is returned
/// (up to the batch limit), otherwise the poll behaves as if the timeout elapsed.
#[derive(Debug)]
pub struct SimulatedCompletionPort {
    completed: CompletionSource,

    // If set, the next dequeue fails with a wait error instead of returning completions.
    fail_next_wait: Arc<Mutex<bool>>,
}

impl SimulatedCompletionPort {
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn new(completed: CompletionSource, fail_next_wait: Arc<Mutex<bool>>) -> Self {
        Self {
            completed,
            fail_next_wait,
        }
    }
}

impl CompletionPort for SimulatedCompletionPort {
    fn post(&self, completion: Completion) -> crate::Result<()> {
        self.poster().post(completion)
    }

    fn dequeue(
        &mut self,
        entries: &mut Vec<Completion>,
        max_entries: usize,
        _timeout: Option<Duration>,
        mode: DrainMode,
    ) -> crate::Result<()> {
        if std::mem::take(&mut *self.fail_next_wait.lock()) {
            return Err(Error::Wait("simulated wait failure".into()));
        }

        let limit = match mode {
            DrainMode::Batched => max_entries,
            DrainMode::Single => 1,
        };

        let mut completed = self.completed.lock();
        let count = limit.min(completed.len());
        entries.extend(completed.drain(..count));

        Ok(())
    }

    fn poster(&self) -> CompletionPosterFacade {
        SimulatedCompletionPoster {
            completed: Arc::clone(&self.completed),
        }
        .into()
    }
}

#[derive(Clone, Debug)]
pub struct SimulatedCompletionPoster {
    completed: CompletionSource,
}

impl CompletionPoster for SimulatedCompletionPoster {
    fn post(&self, completion: Completion) -> crate::Result<()> {
        self.completed.lock().push_back(completion);
        Ok(())
    }
}
