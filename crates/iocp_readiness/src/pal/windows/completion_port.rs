// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem::MaybeUninit;
use std::sync::Arc;
use std::time::Duration;
use std::{ptr, slice};

use tracing::{Level, event};
use windows::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE, WAIT_TIMEOUT};
use windows::Win32::System::IO::{OVERLAPPED, OVERLAPPED_ENTRY};
use windows::Win32::System::Threading::INFINITE;
use windows::core::HRESULT;

use crate::pal::{
    Bindings, BindingsFacade, Completion, CompletionPort, CompletionPosterFacade,
    CompletionPosterImpl, OperationKey,
};
use crate::{DrainMode, Error};

/// Implements the completion port concept using a Windows I/O completion port.
#[derive(derive_more::Debug)]
#[debug("{port:?}")]
pub struct CompletionPortImpl {
    port: Arc<PortHandle>,

    // Only used during dequeueing but part of the struct so the buffer is reused between polls
    // instead of placing a pile of data on the stack every time. Grows to the largest batch seen.
    entries: Box<[MaybeUninit<OVERLAPPED_ENTRY>]>,
}

impl CompletionPortImpl {
    pub(super) fn new(bindings: BindingsFacade) -> crate::Result<Self> {
        let handle = bindings
            .create_io_completion_port(
                INVALID_HANDLE_VALUE, // We are not binding an existing handle right now.
                None,                 // Create a new completion port.
                0,                    // Ignored as we are not binding an existing handle to the port.
                1,                    // The port is only to be read from by one thread (the polling thread).
            )
            .map_err(|e| Error::QueueCreation(Box::new(e)))?;

        let port = Arc::new(PortHandle { handle, bindings });

        event!(Level::TRACE, message = "new completion port", port = ?port.handle);

        Ok(Self {
            port,
            entries: Box::new([]),
        })
    }

    fn dequeue_batch(
        &mut self,
        entries: &mut Vec<Completion>,
        max_entries: usize,
        milliseconds: u32,
    ) -> crate::Result<()> {
        if self.entries.len() < max_entries {
            self.entries = vec![MaybeUninit::uninit(); max_entries].into_boxed_slice();
        }

        let (buffer, _) = self.entries.split_at_mut(max_entries);

        let mut removed: u32 = 0;

        match self.port.bindings.get_queued_completion_status_ex(
            self.port.handle,
            buffer,
            &mut removed,
            milliseconds,
            false,
        ) {
            Ok(()) => {}
            // Timeout just means there was nothing to do - no I/O operations completed.
            Err(e) if is_timeout(&e) => return Ok(()),
            Err(e) => return Err(Error::Wait(Box::new(e))),
        }

        let removed = (removed as usize).min(max_entries);

        // SAFETY: The platform promises it initialized this many entries, and OVERLAPPED_ENTRY
        // is plain data without a destructor so nothing needs to be dropped afterwards.
        let filled = unsafe { slice::from_raw_parts(buffer.as_ptr().cast::<OVERLAPPED_ENTRY>(), removed) };

        entries.extend(filled.iter().map(|entry| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "the status is a 32-bit NTSTATUS stored in a pointer-sized field"
            )]
            let status = entry.Internal as u32;

            Completion::from_raw(
                entry.lpCompletionKey,
                OperationKey(entry.lpOverlapped.expose_provenance()),
                entry.dwNumberOfBytesTransferred,
                status,
            )
        }));

        Ok(())
    }

    fn dequeue_single(&self, entries: &mut Vec<Completion>, milliseconds: u32) -> crate::Result<()> {
        let mut bytes_transferred: u32 = 0;
        let mut completion_key: usize = 0;
        let mut overlapped: *mut OVERLAPPED = ptr::null_mut();

        let result = self.port.bindings.get_queued_completion_status(
            self.port.handle,
            &mut bytes_transferred,
            &mut completion_key,
            &mut overlapped,
            milliseconds,
        );

        match result {
            Ok(()) => entries.push(Completion::from_raw(
                completion_key,
                OperationKey(overlapped.expose_provenance()),
                bytes_transferred,
                0,
            )),
            // The wait succeeded but dequeued an operation that failed.
            #[expect(
                clippy::cast_sign_loss,
                reason = "the status is reinterpreted, not converted"
            )]
            Err(e) if !overlapped.is_null() => entries.push(Completion::from_raw(
                completion_key,
                OperationKey(overlapped.expose_provenance()),
                bytes_transferred,
                e.code().0 as u32,
            )),
            Err(e) if is_timeout(&e) => {}
            Err(e) => return Err(Error::Wait(Box::new(e))),
        }

        Ok(())
    }
}

impl CompletionPort for CompletionPortImpl {
    fn post(&self, completion: Completion) -> crate::Result<()> {
        self.port.post(completion)
    }

    fn dequeue(
        &mut self,
        entries: &mut Vec<Completion>,
        max_entries: usize,
        timeout: Option<Duration>,
        mode: DrainMode,
    ) -> crate::Result<()> {
        let milliseconds = timeout_to_milliseconds(timeout);

        match mode {
            DrainMode::Batched => self.dequeue_batch(entries, max_entries.max(1), milliseconds)?,
            DrainMode::Single => self.dequeue_single(entries, milliseconds)?,
        }

        event!(
            Level::TRACE,
            message = "dequeued completions",
            count = entries.len()
        );

        Ok(())
    }

    fn poster(&self) -> CompletionPosterFacade {
        CompletionPosterImpl::new(Arc::clone(&self.port)).into()
    }
}

/// The completion port handle, shared with posters (which may live on other threads and outlive
/// the backend). The handle is closed when the last reference is dropped.
#[derive(Debug)]
pub struct PortHandle {
    handle: HANDLE,
    bindings: BindingsFacade,
}

impl PortHandle {
    pub(crate) fn post(&self, completion: Completion) -> crate::Result<()> {
        self.bindings.post_queued_completion_status(
            self.handle,
            completion.bytes_transferred(),
            completion.completion_key(),
            completion.operation().0,
        )?;

        Ok(())
    }
}

// SAFETY: Completion port handles are not bound to the thread that created them and all the
// completion port functions we call through this handle are safe to call concurrently.
unsafe impl Send for PortHandle {}
// SAFETY: See above, the handle is only ever passed by value to thread-safe functions.
unsafe impl Sync for PortHandle {}

impl Drop for PortHandle {
    fn drop(&mut self) {
        event!(Level::TRACE, message = "closing completion port", port = ?self.handle);

        // We ignore the error because there is nothing we can do about it at this point.
        _ = self.bindings.close_handle(self.handle);
    }
}

fn is_timeout(error: &windows::core::Error) -> bool {
    error.code() == HRESULT::from_win32(WAIT_TIMEOUT.0)
}

fn timeout_to_milliseconds(timeout: Option<Duration>) -> u32 {
    timeout.map_or(INFINITE, |timeout| {
        // Round up, so a sub-millisecond wait does not turn into a non-blocking check.
        let mut ms = timeout.as_millis();
        if Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX)) < timeout {
            ms = ms.saturating_add(1);
        }

        // Anything too long to express as a finite wait becomes the longest finite wait.
        u32::try_from(ms).map_or(INFINITE - 1, |ms| ms.min(INFINITE - 1))
    })
}
