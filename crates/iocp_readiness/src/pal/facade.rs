// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod completion_port;
mod completion_poster;
mod platform;

pub use completion_port::*;
pub use completion_poster::*;
pub use platform::*;
