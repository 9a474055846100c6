// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod accepted_connection;
mod operation_arena;
mod operation_request;

pub use accepted_connection::*;
pub(crate) use operation_arena::*;
pub use operation_request::*;
