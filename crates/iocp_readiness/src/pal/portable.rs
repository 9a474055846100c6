// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process completion port for targets without I/O completion ports. It honors the same
//! contract as the Windows implementation (posting, batched dequeue with timeout), which lets
//! the readiness translation layer run and be tested on any target.

mod completion_port;
mod completion_poster;
mod platform;

pub use completion_port::*;
pub use completion_poster::*;
pub use platform::*;

pub const fn static_build_target_platform() -> BuildTargetPlatform {
    BuildTargetPlatform
}
