// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::pal::{Completion, CompletionPoster, PortHandle};

#[derive(Clone, Debug)]
pub struct CompletionPosterImpl {
    port: Arc<PortHandle>,
}

impl CompletionPosterImpl {
    pub(crate) const fn new(port: Arc<PortHandle>) -> Self {
        Self { port }
    }
}

impl CompletionPoster for CompletionPosterImpl {
    fn post(&self, completion: Completion) -> crate::Result<()> {
        self.port.post(completion)
    }
}
