// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::pal::{CompletionPortFacade, CompletionPortImpl, Platform};

/// The platform that matches the crate's build target.
#[derive(Debug)]
pub struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn new_completion_port(&self) -> crate::Result<CompletionPortFacade> {
        Ok(CompletionPortImpl::new().into())
    }
}
