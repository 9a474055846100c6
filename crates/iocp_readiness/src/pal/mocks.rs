// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use mockall::mock;

use crate::pal::{CompletionPortFacade, Platform};

mock! {
    #[derive(Debug)]
    pub Platform { }

    impl Platform for Platform {
        fn new_completion_port(&self) -> crate::Result<CompletionPortFacade>;
    }
}
