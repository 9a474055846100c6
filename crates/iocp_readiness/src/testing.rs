// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Testing utilities used in unit tests.

mod functions;
mod simulated_completion_port;
mod unit_test_helpers;

pub(crate) use functions::*;
pub(crate) use simulated_completion_port::*;
pub(crate) use unit_test_helpers::*;
