// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::pal::{Completion, CompletionPoster, SharedQueue};

#[derive(Clone, Debug)]
pub struct CompletionPosterImpl {
    queue: Arc<SharedQueue>,
}

impl CompletionPosterImpl {
    pub(crate) const fn new(queue: Arc<SharedQueue>) -> Self {
        Self { queue }
    }
}

impl CompletionPoster for CompletionPosterImpl {
    fn post(&self, completion: Completion) -> crate::Result<()> {
        self.queue.push(completion);
        Ok(())
    }
}
