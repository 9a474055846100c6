// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod bindings;
mod completion_port;
mod completion_poster;
mod platform;

pub use bindings::*;
pub use completion_port::*;
pub use completion_poster::*;
pub use platform::*;

pub const fn static_build_target_platform() -> BuildTargetPlatform {
    BuildTargetPlatform::new(BindingsFacade::real())
}
