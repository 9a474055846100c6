// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Readiness-based socket event notification on top of a completion-based I/O completion port.
//!
//! Event loops in the style of `select`/`epoll` ask "which sockets are readable or writable right
//! now?" and expect level-triggered answers. Windows I/O completion ports instead tell you when an
//! operation you issued earlier has finished. This crate translates between the two models, so
//! that a readiness-based event loop can run on top of a single shared completion port:
//!
//! * [`IocpBackend`] is the backend itself. The event loop registers interest with
//!   [`set_interest()`][1] and [`clear_interest()`][2] and collects readiness reports with
//!   [`poll()`][3].
//! * [`SocketFacade`] is implemented by the asynchronous socket layer that owns the sockets and
//!   issues the actual operations. The backend calls into it to detect readability.
//! * [`CompletionPoster`] posts completions to the backend from any thread and wakes up a
//!   blocked poll.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use iocp_readiness::{
//!     BackendOptions, Completion, Descriptor, IocpBackend, OperationKey, Readiness,
//!     SocketFacade,
//! };
//!
//! // A facade whose reads are completed by posting their completions by hand.
//! #[derive(Debug)]
//! struct Facade;
//!
//! impl SocketFacade for Facade {
//!     fn queue_zero_byte_read(&mut self, _: Descriptor) -> iocp_readiness::Result<OperationKey> {
//!         Ok(OperationKey(0x1000))
//!     }
//!
//!     fn operation_result(
//!         &self,
//!         _: Descriptor,
//!         completion: &Completion,
//!     ) -> iocp_readiness::Result<u32> {
//!         completion.result()
//!     }
//!
//!     fn release(&mut self) {}
//! }
//!
//! let mut backend = IocpBackend::new(Facade, &BackendOptions::default())?;
//!
//! backend.set_interest(Descriptor(5), Readiness::READABLE)?;
//! backend
//!     .poster()
//!     .complete(Descriptor(5), OperationKey(0x1000), 0)?;
//!
//! let fired = backend.poll(Some(Duration::from_secs(5)))?;
//! assert_eq!(fired.len(), 1);
//! assert_eq!(fired[0].descriptor(), Descriptor(5));
//! assert_eq!(fired[0].readiness(), Readiness::READABLE);
//! # Ok::<(), iocp_readiness::Error>(())
//! ```
//!
//! [1]: IocpBackend::set_interest
//! [2]: IocpBackend::clear_interest
//! [3]: IocpBackend::poll

#![cfg_attr(
    not(windows),
    allow(
        dead_code,
        reason = "Off Windows, the PAL is an in-process queue and parts of the Windows-facing surface are unused."
    )
)]

pub(crate) mod pal;
#[cfg(test)]
pub(crate) mod testing;

mod backend;
mod constants;
mod error;
mod operations;
mod options;
mod poster;
mod readiness;
mod socket_facade;
mod sockets;

pub use backend::*;
pub use constants::{BACKEND_NAME, DEFAULT_CAPACITY, DEFAULT_DRAIN_BATCH_SIZE};
pub use error::*;
pub use operations::{AcceptedConnection, OperationKind, OperationRequest, WriteContinuation};
pub use options::*;
pub use pal::{Completion, OperationKey};
pub use poster::*;
pub use readiness::*;
pub use socket_facade::*;
pub use sockets::{SocketFlags, SocketState};
