// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::mem::MaybeUninit;

use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::IO::{OVERLAPPED, OVERLAPPED_ENTRY};
use windows::core::Result;

/// Bindings for FFI calls into the operating system.
///
/// All PAL FFI calls must go through this trait, enabling them to be mocked.
#[cfg_attr(test, mockall::automock)]
pub trait Bindings: Debug + Send + Sync + 'static {
    fn close_handle(&self, handle: HANDLE) -> Result<()>;

    fn create_io_completion_port(
        &self,
        file_handle: HANDLE,
        existing_completion_port: Option<HANDLE>,
        completion_key: usize,
        number_of_concurrent_threads: u32,
    ) -> Result<HANDLE>;

    fn get_queued_completion_status_ex(
        &self,
        completion_port: HANDLE,
        completion_port_entries: &mut [MaybeUninit<OVERLAPPED_ENTRY>],
        num_entries_removed: &mut u32,
        milliseconds: u32,
        alertable: bool,
    ) -> Result<()>;

    /// Dequeues one completion. On failure, `overlapped` tells apart a dequeued failed operation
    /// (non-null) from a failed or timed out wait (null).
    fn get_queued_completion_status(
        &self,
        completion_port: HANDLE,
        bytes_transferred: &mut u32,
        completion_key: &mut usize,
        overlapped: &mut *mut OVERLAPPED,
        milliseconds: u32,
    ) -> Result<()>;

    /// The operating system never dereferences `overlapped` for posted completions, it is only
    /// handed back unchanged when the completion is dequeued.
    fn post_queued_completion_status(
        &self,
        completion_port: HANDLE,
        bytes_transferred: u32,
        completion_key: usize,
        overlapped: usize,
    ) -> Result<()>;
}
