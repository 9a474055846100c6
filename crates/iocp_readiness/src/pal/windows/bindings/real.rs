// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::mem::MaybeUninit;
use std::ptr;

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::IO::{
    CreateIoCompletionPort, GetQueuedCompletionStatus, OVERLAPPED, OVERLAPPED_ENTRY,
    PostQueuedCompletionStatus,
};
use windows::core::{BOOL, Result};

use crate::pal::Bindings;

/// FFI bindings that target the real operating system that the build is targeting.
///
/// You would only use different bindings in PAL unit tests that need to use mock bindings.
#[derive(Debug, Default)]
pub struct BuildTargetBindings;

impl Bindings for BuildTargetBindings {
    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn close_handle(&self, handle: HANDLE) -> Result<()> {
        // SAFETY: No safety requirements. Closing a handle twice is logically
        // invalid but does not violate Rust language rules, so not a safety concern.
        unsafe { CloseHandle(handle) }
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn create_io_completion_port(
        &self,
        file_handle: HANDLE,
        existing_completion_port: Option<HANDLE>,
        completion_key: usize,
        number_of_concurrent_threads: u32,
    ) -> Result<HANDLE> {
        // SAFETY: No safety requirements.
        unsafe {
            CreateIoCompletionPort(
                file_handle,
                existing_completion_port,
                completion_key,
                number_of_concurrent_threads,
            )
        }
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn get_queued_completion_status_ex(
        &self,
        completion_port: HANDLE,
        completion_port_entries: &mut [MaybeUninit<OVERLAPPED_ENTRY>],
        num_entries_removed: &mut u32,
        milliseconds: u32,
        alertable: bool,
    ) -> Result<()> {
        // The drain batch size is bounded by the backend capacity, which is far below u32::MAX.
        let entries_len = u32::try_from(completion_port_entries.len()).unwrap_or(u32::MAX);

        // We use GetQueuedCompletionStatusEx from windows-sys because the one from the windows
        // crate takes `&mut` which presumes initialized memory. However, we are passing an
        // uninitialized buffer! https://github.com/microsoft/windows-rs/issues/2106
        #[expect(
            clippy::absolute_paths,
            reason = "intentionally being explicit for clarity"
        )]
        let entries_as_mut_ptr_sys = completion_port_entries
            .as_mut_ptr()
            .cast::<windows_sys::Win32::System::IO::OVERLAPPED_ENTRY>();

        // SAFETY: No safety requirements, the input pointers just have to outlive the call,
        // which they do, being borrowed until end of scope.
        let result_bool = unsafe {
            #[expect(
                clippy::absolute_paths,
                reason = "intentionally being explicit for clarity"
            )]
            windows_sys::Win32::System::IO::GetQueuedCompletionStatusEx(
                completion_port.0,
                entries_as_mut_ptr_sys,
                entries_len,
                &raw mut *num_entries_removed,
                milliseconds,
                i32::from(alertable),
            )
        };

        BOOL(result_bool).ok()
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn get_queued_completion_status(
        &self,
        completion_port: HANDLE,
        bytes_transferred: &mut u32,
        completion_key: &mut usize,
        overlapped: &mut *mut OVERLAPPED,
        milliseconds: u32,
    ) -> Result<()> {
        // SAFETY: No safety requirements, the output pointers are borrowed for the whole call.
        unsafe {
            GetQueuedCompletionStatus(
                completion_port,
                &raw mut *bytes_transferred,
                &raw mut *completion_key,
                &raw mut *overlapped,
                milliseconds,
            )
        }
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn post_queued_completion_status(
        &self,
        completion_port: HANDLE,
        bytes_transferred: u32,
        completion_key: usize,
        overlapped: usize,
    ) -> Result<()> {
        // The value is handed back to us verbatim by the dequeue, never dereferenced.
        let overlapped = ptr::with_exposed_provenance::<OVERLAPPED>(overlapped);

        // SAFETY: No safety requirements.
        unsafe {
            PostQueuedCompletionStatus(
                completion_port,
                bytes_transferred,
                completion_key,
                Some(overlapped),
            )
        }
    }
}
