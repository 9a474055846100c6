// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::pal::{Completion, MockPlatform};
use crate::testing::{CompletionSource, SimulatedCompletionPort};

/// Handles for steering a simulated completion port from test code.
#[derive(Clone, Debug)]
pub struct CompletionPortSimulationState {
    completed: CompletionSource,
    fail_next_wait: Arc<Mutex<bool>>,
}

impl CompletionPortSimulationState {
    /// Makes a completion available to the next poll, as if the operating system delivered it.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub fn deliver(&self, completion: Completion) {
        self.completed.lock().push_back(completion);
    }

    /// The next poll fails to wait for completions.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub fn fail_next_wait(&self) {
        *self.fail_next_wait.lock() = true;
    }

    /// Number of completions queued but not yet dequeued.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub fn pending(&self) -> usize {
        self.completed.lock().len()
    }
}

/// Uses a simulated completion port that returns the completions delivered via the returned
/// state, never waiting for more.
#[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
pub fn use_simulated_completion_port(pal: &mut MockPlatform) -> CompletionPortSimulationState {
    let completed: CompletionSource = Arc::new(Mutex::new(VecDeque::new()));
    let fail_next_wait = Arc::new(Mutex::new(false));

    pal.expect_new_completion_port().times(1).returning({
        let completed = Arc::clone(&completed);
        let fail_next_wait = Arc::clone(&fail_next_wait);
        move || {
            Ok(
                SimulatedCompletionPort::new(Arc::clone(&completed), Arc::clone(&fail_next_wait))
                    .into(),
            )
        }
    });

    CompletionPortSimulationState {
        completed,
        fail_next_wait,
    }
}
