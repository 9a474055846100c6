// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::pal::{BindingsFacade, CompletionPortFacade, CompletionPortImpl, Platform};

/// The platform that matches the crate's build target.
///
/// You would only use a different platform in unit tests that need to mock the platform.
/// Even then, whenever possible, unit tests should use the real platform for maximum realism.
#[derive(Debug)]
pub struct BuildTargetPlatform {
    bindings: BindingsFacade,
}

impl BuildTargetPlatform {
    pub(crate) const fn new(bindings: BindingsFacade) -> Self {
        Self { bindings }
    }
}

impl Platform for BuildTargetPlatform {
    fn new_completion_port(&self) -> crate::Result<CompletionPortFacade> {
        Ok(CompletionPortImpl::new(self.bindings.clone())?.into())
    }
}
