// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::pal::CompletionPortFacade;

pub trait Platform: Debug + Send + Sync + 'static {
    /// Creates a completion port to be read from by exactly one thread.
    fn new_completion_port(&self) -> crate::Result<CompletionPortFacade>;
}
