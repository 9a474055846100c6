// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod socket_registry;
mod socket_state;

pub(crate) use socket_registry::*;
pub use socket_state::*;
