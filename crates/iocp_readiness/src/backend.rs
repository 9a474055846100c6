// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem;
use std::time::Duration;

use tracing::{Level, event};

use crate::constants::WAKE_UP_COMPLETION_KEY;
use crate::operations::OperationArena;
use crate::pal::{CompletionPort, CompletionPortFacade, Platform, PlatformFacade};
use crate::sockets::{SocketFlags, SocketRegistry};
use crate::{
    AcceptedConnection, BACKEND_NAME, BackendOptions, Completion, CompletionPoster, Descriptor,
    Error, FiredEvent, OperationKey, OperationKind, OperationRequest, Readiness, SocketFacade,
    SocketState, WriteContinuation,
};

/// Lets a readiness-based event loop run on top of a completion port.
///
/// The event loop registers interest in sockets becoming readable or writable and then
/// repeatedly [polls][1] the backend, which reports the sockets that became ready. Underneath,
/// readiness is simulated with operations whose completions are delivered by the completion port:
///
/// * Readability is detected by a zero-byte read, issued through the [`SocketFacade`]. It completes
///   once data is available without consuming any of it.
/// * Writability is armed by posting a synthetic write completion. A socket with real writes in
///   flight becomes writable again once the last of them completes.
/// * A listening socket becomes readable when an accept completes on it. The accept results
///   queue up on the socket until the facade [takes them][2].
///
/// Readiness reports are level-triggered: a socket that is still readable after its data has
/// been consumed is reported again, because the next poll issues a new zero-byte read for every
/// socket it reported readable.
///
/// # Socket state lifecycle
///
/// The backend keeps some state per socket. The state is created on first reference and deleted
/// as soon as nothing can refer to it anymore: no write in flight, no zero-byte read queued and
/// not [attached][3] by the facade.
///
/// # Thread safety
///
/// This is a single-threaded type. All calls must come from the thread that runs the event loop.
/// The only part usable from other threads is the [`CompletionPoster`] returned by
/// [`poster()`][4].
///
/// [1]: Self::poll
/// [2]: Self::take_accepted
/// [3]: Self::attach
/// [4]: Self::poster
#[derive(Debug)]
pub struct IocpBackend<F: SocketFacade> {
    port: CompletionPortFacade,
    options: BackendOptions,

    // Reused between polls to avoid allocating on every poll.
    completions: Vec<Completion>,
    fired: Vec<FiredEvent>,

    registry: SocketRegistry,
    operations: OperationArena,

    // Sockets reported readable by the previous poll. Each gets a new zero-byte read at the start
    // of the next poll, after the event loop has had the chance to consume the available data.
    rearm_queue: Vec<Descriptor>,

    facade: F,
}

impl<F: SocketFacade> IocpBackend<F> {
    /// Creates a backend with its own completion port, taking ownership of the socket facade.
    ///
    /// # Errors
    ///
    /// Fails if the completion port cannot be created.
    pub fn new(facade: F, options: &BackendOptions) -> crate::Result<Self> {
        Self::with_platform(facade, options, &PlatformFacade::real())
    }

    pub(crate) fn with_platform(
        facade: F,
        options: &BackendOptions,
        pal: &PlatformFacade,
    ) -> crate::Result<Self> {
        let port = pal.new_completion_port()?;

        event!(
            Level::TRACE,
            message = "backend created",
            capacity = options.capacity().get(),
            drain_batch_size = options.effective_drain_batch_size().get(),
            drain_mode = ?options.drain_mode()
        );

        Ok(Self {
            port,
            options: options.clone(),
            completions: Vec::with_capacity(options.effective_drain_batch_size().get()),
            fired: Vec::new(),
            registry: SocketRegistry::new(options.capacity()),
            operations: OperationArena::new(),
            rearm_queue: Vec::new(),
            facade,
        })
    }

    /// Descriptive name of the backend, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    /// Starts reporting the given kinds of readiness of the socket.
    ///
    /// Readability is armed by asking the facade to issue a zero-byte read, unless one is already
    /// queued or the socket is listening (listening sockets become readable through accepts).
    /// Writability is armed by posting a synthetic write completion, unless writes are already in
    /// flight (the last of which to complete makes the socket writable).
    ///
    /// Each kind of readiness is only registered once it has been armed.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if the socket is not tracked yet and the backend is already
    ///   tracking as many sockets as its capacity allows, or if writability is requested on a
    ///   listening socket.
    /// * Any error from the facade when issuing the zero-byte read.
    /// * Any error from posting the synthetic write completion.
    pub fn set_interest(&mut self, descriptor: Descriptor, readiness: Readiness) -> crate::Result<()> {
        let result = self.arm(descriptor, readiness);

        if result.is_err() {
            // Do not leave behind a state that was created just for this call.
            self.registry.remove_if_reclaimable(descriptor);
        }

        result
    }

    fn arm(&mut self, descriptor: Descriptor, readiness: Readiness) -> crate::Result<()> {
        let state = track(&mut self.registry, descriptor)?;

        if readiness.contains(Readiness::WRITABLE) && state.is_listening() {
            return Err(Error::InvalidArgument(format!(
                "socket {descriptor} is listening and cannot become writable"
            )));
        }

        if readiness.contains(Readiness::READABLE) {
            if !state.is_listening() && !state.is_read_queued() {
                let operation = self.facade.queue_zero_byte_read(descriptor)?;
                state.read_queued(operation);

                event!(Level::TRACE, message = "zero-byte read queued", descriptor = %descriptor, operation = ?operation);
            }

            state.add_interest(Readiness::READABLE);
        }

        if readiness.contains(Readiness::WRITABLE) {
            if state.pending_write_count() == 0 {
                let operation = self.operations.next_synthetic_key();

                // The key is free, next_synthetic_key() skips keys in flight.
                self.operations
                    .insert(operation, OperationRequest::write(descriptor, None));

                if let Err(e) = self.port.post(Completion::new(descriptor, operation, 0)) {
                    self.operations.remove(operation);
                    return Err(e);
                }

                state.write_started();

                event!(Level::TRACE, message = "writability armed", descriptor = %descriptor, operation = ?operation);
            }

            state.add_interest(Readiness::WRITABLE);
        }

        Ok(())
    }

    /// Stops reporting the given kinds of readiness of the socket.
    ///
    /// Operations already in flight are not cancelled. Their completions simply do not produce
    /// readiness reports anymore. Calling this for an untracked socket does nothing.
    pub fn clear_interest(&mut self, descriptor: Descriptor, readiness: Readiness) {
        if let Some(state) = self.registry.get_mut(descriptor) {
            state.remove_interest(readiness);
        }
    }

    /// Waits for operations to complete and reports the sockets that became ready as a result.
    ///
    /// Waits at most `timeout`, which may be zero for a non-blocking check. `None` waits until at
    /// least one completion arrives. A [wake-up signal][1] ends the wait early without being
    /// reported.
    ///
    /// The reports are in the order the completions were delivered. A socket that became both
    /// readable and writable is reported twice, once for each. The number of reports never exceeds
    /// the capacity of the backend.
    ///
    /// # Errors
    ///
    /// Fails if waiting for completions fails for any reason other than the wait timing out.
    /// Completions that were not dequeued remain queued for a later poll.
    ///
    /// [1]: crate::CompletionPoster::wake
    pub fn poll(&mut self, timeout: Option<Duration>) -> crate::Result<&[FiredEvent]> {
        self.fired.clear();

        self.rearm_reads();

        let mut completions = mem::take(&mut self.completions);
        completions.clear();

        let result = self.port.dequeue(
            &mut completions,
            self.options.effective_drain_batch_size().get(),
            timeout,
            self.options.drain_mode(),
        );

        if let Err(e) = result {
            self.completions = completions;
            return Err(e);
        }

        let capacity = self.options.capacity().get();

        for completion in &completions {
            if self.fired.len() >= capacity {
                break;
            }

            self.process_completion(completion);
        }

        event!(
            Level::TRACE,
            message = "poll finished",
            completions = completions.len(),
            fired = self.fired.len()
        );

        self.completions = completions;

        Ok(&self.fired)
    }

    fn rearm_reads(&mut self) {
        let mut queue = mem::take(&mut self.rearm_queue);

        for descriptor in queue.drain(..) {
            let Some(state) = self.registry.get_mut(descriptor) else {
                continue;
            };

            if state.is_listening()
                || state.is_read_queued()
                || !state.interest().contains(Readiness::READABLE)
            {
                continue;
            }

            match self.facade.queue_zero_byte_read(descriptor) {
                Ok(operation) => {
                    state.read_queued(operation);
                    event!(Level::TRACE, message = "zero-byte read re-armed", descriptor = %descriptor, operation = ?operation);
                }
                Err(e) => {
                    event!(Level::WARN, message = "failed to re-arm zero-byte read", descriptor = %descriptor, error = %e);
                }
            }
        }

        self.rearm_queue = queue;
    }

    fn process_completion(&mut self, completion: &Completion) {
        if completion.is_wake_up_signal() {
            event!(Level::TRACE, message = "wake-up signal received");
            return;
        }

        let descriptor = completion.descriptor();
        let operation = completion.operation();

        let Some(state) = self.registry.get_mut(descriptor) else {
            // An accept registered on a socket that was detached before it completed.
            if let Some(request) = take_operation(&mut self.operations, descriptor, operation) {
                event!(Level::TRACE, message = "operation of untracked socket released", descriptor = %descriptor, operation = ?operation, kind = ?request.kind());
            } else {
                event!(Level::TRACE, message = "completion for untracked socket ignored", descriptor = %descriptor, operation = ?operation);
            }
            return;
        };

        if state.is_listening() {
            if take_operation(&mut self.operations, descriptor, operation).is_none() {
                event!(Level::WARN, message = "accept completed that was not registered", descriptor = %descriptor, operation = ?operation);
            }

            let result = self.facade.operation_result(descriptor, completion);
            state.accept_completed(AcceptedConnection::new(operation, result));

            if state.interest().contains(Readiness::READABLE) {
                self.fired
                    .push(FiredEvent::new(descriptor, Readiness::READABLE));
            }
        } else if state.read_completed(operation) {
            if state.interest().contains(Readiness::READABLE) {
                self.fired
                    .push(FiredEvent::new(descriptor, Readiness::READABLE));
                self.rearm_queue.push(descriptor);
            }
        } else {
            match take_operation(&mut self.operations, descriptor, operation) {
                Some(request) if request.kind() == OperationKind::Write => {
                    let facade = &self.facade;
                    request.complete(|| facade.operation_result(descriptor, completion));

                    if state.write_completed() == 0
                        && state.interest().contains(Readiness::WRITABLE)
                    {
                        self.fired
                            .push(FiredEvent::new(descriptor, Readiness::WRITABLE));
                    }
                }
                Some(request) => {
                    event!(Level::WARN, message = "non-write operation completed on a non-listening socket", descriptor = %descriptor, operation = ?operation, kind = ?request.kind());
                }
                None if state.pending_write_count() > 0 => {
                    event!(Level::WARN, message = "write completed that was not in flight", descriptor = %descriptor, operation = ?operation);
                }
                None => {
                    event!(Level::TRACE, message = "stale completion ignored", descriptor = %descriptor, operation = ?operation);
                }
            }
        }

        if self.registry.remove_if_reclaimable(descriptor) {
            event!(Level::TRACE, message = "socket state deleted", descriptor = %descriptor);
        }
    }

    /// Keeps the state of the socket alive between operations, until [`detach()`][1].
    ///
    /// The facade attaches every socket it opens, so that results held by the backend on behalf
    /// of the socket survive the completion of the operation that produced them.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the socket is not tracked yet and the backend is already
    /// tracking as many sockets as its capacity allows.
    ///
    /// [1]: Self::detach
    pub fn attach(&mut self, descriptor: Descriptor) -> crate::Result<()> {
        track(&mut self.registry, descriptor)?.insert_flags(SocketFlags::ATTACHED);
        Ok(())
    }

    /// Stops watching the socket. Called by the facade when it closes the socket.
    ///
    /// The state is deleted right away if no operation is in flight. Otherwise it is deleted by
    /// the poll that processes the last completion referring to it.
    pub fn detach(&mut self, descriptor: Descriptor) {
        let Some(state) = self.registry.get_mut(descriptor) else {
            return;
        };

        state.remove_flags(SocketFlags::ATTACHED);
        state.remove_interest(Readiness::all());

        if self.registry.remove_if_reclaimable(descriptor) {
            event!(Level::TRACE, message = "socket state deleted", descriptor = %descriptor);
        }
    }

    /// Marks the socket as listening for incoming connections. From now on, it becomes readable
    /// when an accept registered with [`begin_accept()`][1] completes.
    ///
    /// A listening socket is attached, so accepted connections are held until taken.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the socket cannot be tracked, or if it has a zero-byte read
    /// queued, writes in flight or interest in writability.
    ///
    /// [1]: Self::begin_accept
    pub fn listen(&mut self, descriptor: Descriptor) -> crate::Result<()> {
        let state = track(&mut self.registry, descriptor)?;

        if state.is_read_queued()
            || state.pending_write_count() > 0
            || state.interest().contains(Readiness::WRITABLE)
        {
            return Err(Error::InvalidArgument(format!(
                "socket {descriptor} has reads or writes associated with it and cannot listen"
            )));
        }

        state.insert_flags(SocketFlags::LISTENING | SocketFlags::ATTACHED);

        event!(Level::TRACE, message = "socket listening", descriptor = %descriptor);

        Ok(())
    }

    /// Registers an accept the facade issued on a listening socket. Its completion must carry the
    /// socket as completion key and `operation` as operation key.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the socket is not listening, an operation with the same key
    /// is already in flight, or the key is odd. Odd keys are reserved for the operations the
    /// backend posts itself.
    pub fn begin_accept(&mut self, descriptor: Descriptor, operation: OperationKey) -> crate::Result<()> {
        reject_synthetic_key(operation)?;

        let Some(state) = self
            .registry
            .get_mut(descriptor)
            .filter(|state| state.is_listening())
        else {
            return Err(Error::InvalidArgument(format!(
                "socket {descriptor} is not listening"
            )));
        };

        if !self
            .operations
            .insert(operation, OperationRequest::accept(descriptor))
        {
            return Err(Error::InvalidArgument(format!(
                "operation {operation:?} is already in flight"
            )));
        }

        state.insert_flags(SocketFlags::ACCEPT_PENDING);

        Ok(())
    }

    /// Registers a write the facade issued on the socket. Its completion must carry the socket as
    /// completion key and `operation` as operation key. The continuation, if any, is invoked with
    /// the outcome of the write when the completion is processed by a poll.
    ///
    /// While writes are in flight, the socket is not reported writable. It becomes writable again
    /// when the last of them completes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the socket cannot be tracked or is listening, an operation
    /// with the same key is already in flight, or the key is odd. Odd keys are reserved for the
    /// operations the backend posts itself.
    pub fn begin_write(
        &mut self,
        descriptor: Descriptor,
        operation: OperationKey,
        continuation: Option<WriteContinuation>,
    ) -> crate::Result<()> {
        reject_synthetic_key(operation)?;

        let state = track(&mut self.registry, descriptor)?;

        if state.is_listening() {
            return Err(Error::InvalidArgument(format!(
                "socket {descriptor} is listening and cannot be written to"
            )));
        }

        if !self
            .operations
            .insert(operation, OperationRequest::write(descriptor, continuation))
        {
            // The state may have been created by this call.
            self.registry.remove_if_reclaimable(descriptor);

            return Err(Error::InvalidArgument(format!(
                "operation {operation:?} is already in flight"
            )));
        }

        state.write_started();

        Ok(())
    }

    /// Takes the oldest accept result held for the listening socket, if any.
    pub fn take_accepted(&mut self, descriptor: Descriptor) -> Option<AcceptedConnection> {
        self.registry
            .get_mut(descriptor)
            .and_then(SocketState::take_accepted)
    }

    /// Returns a handle that posts completions to the completion port of this backend, from any
    /// thread, and wakes up a blocked poll.
    #[must_use]
    pub fn poster(&self) -> CompletionPoster {
        CompletionPoster::new(self.port.poster())
    }

    /// The state of the socket, if the backend is tracking it.
    #[must_use]
    pub fn socket(&self, descriptor: Descriptor) -> Option<&SocketState> {
        self.registry.get(descriptor)
    }

    /// The number of sockets the backend is tracking.
    #[must_use]
    pub fn tracked_sockets(&self) -> usize {
        self.registry.len()
    }

    /// The number of writes and accepts the backend is waiting for the completion of.
    /// Zero-byte reads are tracked per socket and not counted here.
    #[must_use]
    pub fn in_flight_operations(&self) -> usize {
        self.operations.len()
    }

    /// The socket facade the backend was created with.
    #[must_use]
    pub const fn facade(&self) -> &F {
        &self.facade
    }
}

impl<F: SocketFacade> Drop for IocpBackend<F> {
    fn drop(&mut self) {
        event!(
            Level::TRACE,
            message = "backend dropped",
            tracked_sockets = self.registry.len(),
            in_flight_operations = self.operations.len()
        );

        self.facade.release();

        // The completion port is closed when the last reference to it is dropped, which may be
        // held by a poster that outlives the backend.
    }
}

fn track(registry: &mut SocketRegistry, descriptor: Descriptor) -> crate::Result<&mut SocketState> {
    if descriptor.0 == WAKE_UP_COMPLETION_KEY {
        return Err(Error::InvalidArgument(format!(
            "descriptor {descriptor} is reserved for wake-up signals"
        )));
    }

    let tracked = registry.len();

    registry.get_or_create(descriptor).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "cannot track socket {descriptor}, already tracking {tracked} sockets"
        ))
    })
}

fn reject_synthetic_key(operation: OperationKey) -> crate::Result<()> {
    if OperationArena::is_synthetic(operation) {
        return Err(Error::InvalidArgument(format!(
            "operation {operation:?} has an odd key, which is reserved for synthetic operations"
        )));
    }

    Ok(())
}

/// Removes the operation the completion refers to, if it was issued on the socket the completion
/// belongs to.
fn take_operation(
    operations: &mut OperationArena,
    descriptor: Descriptor,
    operation: OperationKey,
) -> Option<OperationRequest> {
    operations
        .remove_issued_on(descriptor, operation)
        .unwrap_or_else(|issued_on| {
            event!(Level::WARN, message = "completion refers to an operation of another socket", descriptor = %descriptor, operation = ?operation, issued_on = %issued_on);
            None
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "Perfectly fine in test code")]

    use std::cell::RefCell;
    use std::num::NonZeroUsize;
    use std::rc::Rc;

    use mockall::Sequence;
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::MockSocketFacade;
    use crate::pal::MockPlatform;
    use crate::testing::{
        CompletionPortSimulationState, log_to_console, use_simulated_completion_port,
    };

    const READ_KEY: OperationKey = OperationKey(0x1000);

    fn ready(descriptor: usize, readiness: Readiness) -> FiredEvent {
        FiredEvent::new(Descriptor(descriptor), readiness)
    }

    /// A facade that hands out the given read keys in order and reports completion status as-is.
    fn facade_with_reads(read_keys: &[OperationKey]) -> MockSocketFacade {
        let mut facade = MockSocketFacade::new();
        let mut seq = Sequence::new();

        for &key in read_keys {
            facade
                .expect_queue_zero_byte_read()
                .times(1)
                .in_sequence(&mut seq)
                .return_once(move |_| Ok(key));
        }

        facade
            .expect_operation_result()
            .returning(|_, completion| completion.result());

        facade.expect_release().times(1).return_const(());

        facade
    }

    fn new_backend(
        facade: MockSocketFacade,
        options: &BackendOptions,
    ) -> (IocpBackend<MockSocketFacade>, CompletionPortSimulationState) {
        let mut platform = MockPlatform::new();
        let simulation = use_simulated_completion_port(&mut platform);

        let backend =
            IocpBackend::with_platform(facade, options, &PlatformFacade::from_mock(platform))
                .unwrap();

        (backend, simulation)
    }

    #[test]
    fn name() {
        let (backend, _) = new_backend(facade_with_reads(&[]), &BackendOptions::default());

        assert_eq!(backend.name(), "winsock_IOCP");
    }

    #[test]
    fn create_fails_without_completion_port() {
        let mut platform = MockPlatform::new();
        platform
            .expect_new_completion_port()
            .times(1)
            .returning(|| Err(Error::QueueCreation("no port for you".into())));

        // The facade is dropped unreleased, as there is no backend to release it.
        let result = IocpBackend::with_platform(
            MockSocketFacade::new(),
            &BackendOptions::default(),
            &PlatformFacade::from_mock(platform),
        );

        assert!(matches!(result, Err(Error::QueueCreation(_))));
    }

    #[test]
    fn readable_reported_once() {
        let _guard = log_to_console();

        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap();

        let state = backend.socket(Descriptor(5)).unwrap();
        assert!(state.is_read_queued());
        assert_eq!(state.interest(), Readiness::READABLE);

        simulation.deliver(Completion::new(Descriptor(5), READ_KEY, 0));

        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(5, Readiness::READABLE)]
        );

        // Not attached and nothing in flight anymore, so the state is gone.
        assert!(backend.socket(Descriptor(5)).is_none());

        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
    }

    #[test]
    fn readable_rearmed_for_attached_socket() {
        let second_read = OperationKey(0x2000);
        let (mut backend, simulation) = new_backend(
            facade_with_reads(&[READ_KEY, second_read]),
            &BackendOptions::default(),
        );

        backend.attach(Descriptor(5)).unwrap();
        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap();

        simulation.deliver(Completion::new(Descriptor(5), READ_KEY, 0));
        assert_eq!(backend.poll(Some(Duration::ZERO)).unwrap().len(), 1);
        assert!(!backend.socket(Descriptor(5)).unwrap().is_read_queued());

        // The next poll issues a new zero-byte read before waiting.
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert!(backend.socket(Descriptor(5)).unwrap().is_read_queued());

        simulation.deliver(Completion::new(Descriptor(5), second_read, 0));
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(5, Readiness::READABLE)]
        );
    }

    #[test]
    fn rearm_failure_is_not_fatal() {
        let mut facade = MockSocketFacade::new();
        let mut seq = Sequence::new();

        facade
            .expect_queue_zero_byte_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Ok(READ_KEY));
        facade
            .expect_queue_zero_byte_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Err(Error::InvalidArgument("socket closed".to_string())));
        facade.expect_release().times(1).return_const(());

        let (mut backend, simulation) = new_backend(facade, &BackendOptions::default());

        backend.attach(Descriptor(5)).unwrap();
        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap();

        simulation.deliver(Completion::new(Descriptor(5), READ_KEY, 0));
        assert_eq!(backend.poll(Some(Duration::ZERO)).unwrap().len(), 1);

        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert!(!backend.socket(Descriptor(5)).unwrap().is_read_queued());
    }

    #[test]
    fn no_rearm_after_interest_cleared() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend.attach(Descriptor(5)).unwrap();
        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap();

        simulation.deliver(Completion::new(Descriptor(5), READ_KEY, 0));
        assert_eq!(backend.poll(Some(Duration::ZERO)).unwrap().len(), 1);

        backend.clear_interest(Descriptor(5), Readiness::READABLE);

        // The facade mock would panic on an unexpected second read.
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert!(!backend.socket(Descriptor(5)).unwrap().is_read_queued());
    }

    #[test]
    fn read_already_queued_is_not_queued_again() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap();
        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap();

        assert!(backend.socket(Descriptor(5)).unwrap().is_read_queued());
    }

    #[test]
    fn read_failure_sets_no_interest() {
        let mut facade = MockSocketFacade::new();
        facade
            .expect_queue_zero_byte_read()
            .times(1)
            .return_once(|_| Err(Error::InvalidArgument("not connected".to_string())));
        facade.expect_release().times(1).return_const(());

        let (mut backend, _simulation) = new_backend(facade, &BackendOptions::default());

        backend.attach(Descriptor(5)).unwrap();

        let result = backend.set_interest(Descriptor(5), Readiness::READABLE);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let state = backend.socket(Descriptor(5)).unwrap();
        assert!(state.interest().is_empty());
        assert!(!state.is_read_queued());
    }

    #[test]
    fn failure_leaves_no_state_behind() {
        let mut facade = MockSocketFacade::new();
        facade
            .expect_queue_zero_byte_read()
            .times(1)
            .return_once(|_| Err(Error::InvalidArgument("not connected".to_string())));
        facade.expect_release().times(1).return_const(());

        let (mut backend, _simulation) = new_backend(facade, &BackendOptions::default());

        backend
            .set_interest(Descriptor(5), Readiness::READABLE)
            .unwrap_err();

        assert_eq!(backend.tracked_sockets(), 0);
    }

    #[test]
    fn writable_reported_once() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.attach(Descriptor(7)).unwrap();
        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();

        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 1);
        assert_eq!(backend.in_flight_operations(), 1);

        // The arming completion was posted to the port by the backend itself.
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(7, Readiness::WRITABLE)]
        );

        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 0);
        assert_eq!(backend.in_flight_operations(), 0);

        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
    }

    #[test]
    fn writable_arming_is_not_repeated_while_writes_in_flight() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();
        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();

        assert_eq!(simulation.pending(), 1);
        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 1);
    }

    #[test]
    fn writable_after_last_real_write() {
        let written = Rc::new(RefCell::new(Vec::new()));
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        for key in [0x100, 0x200] {
            backend
                .begin_write(
                    Descriptor(7),
                    OperationKey(key),
                    Some(Box::new({
                        let written = Rc::clone(&written);
                        move |descriptor: Descriptor, result: crate::Result<u32>| {
                            written.borrow_mut().push((descriptor, result.unwrap()));
                        }
                    })),
                )
                .unwrap();
        }

        // Writes are in flight, so no arming completion is needed.
        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();
        assert_eq!(simulation.pending(), 0);
        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 2);

        simulation.deliver(Completion::new(Descriptor(7), OperationKey(0x100), 10));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        simulation.deliver(Completion::new(Descriptor(7), OperationKey(0x200), 20));
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(7, Readiness::WRITABLE)]
        );

        assert_eq!(
            *written.borrow(),
            [(Descriptor(7), 10), (Descriptor(7), 20)]
        );

        // Not attached, nothing in flight.
        assert!(backend.socket(Descriptor(7)).is_none());
    }

    #[test]
    fn failed_write_reported_to_continuation() {
        let outcome = Rc::new(RefCell::new(None));
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend
            .begin_write(
                Descriptor(7),
                OperationKey(0x100),
                Some(Box::new({
                    let outcome = Rc::clone(&outcome);
                    move |_: Descriptor, result: crate::Result<u32>| {
                        *outcome.borrow_mut() = Some(result);
                    }
                })),
            )
            .unwrap();

        simulation.deliver(Completion::failed(Descriptor(7), OperationKey(0x100), 0x2746));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        assert!(matches!(
            outcome.borrow_mut().take(),
            Some(Err(Error::OperationFailed(0x2746)))
        ));
    }

    #[test]
    fn unknown_write_completion_does_not_touch_count() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend
            .begin_write(Descriptor(7), OperationKey(0x100), None)
            .unwrap();

        simulation.deliver(Completion::new(Descriptor(7), OperationKey(0x900), 10));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 1);
    }

    #[test]
    fn duplicate_write_key_rejected() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend
            .begin_write(Descriptor(7), OperationKey(0x100), None)
            .unwrap();

        let result = backend.begin_write(Descriptor(8), OperationKey(0x100), None);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        assert!(backend.socket(Descriptor(8)).is_none());
        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 1);
    }

    #[test]
    fn readable_and_writable_reported_separately() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend.attach(Descriptor(3)).unwrap();
        backend
            .set_interest(Descriptor(3), Readiness::READABLE | Readiness::WRITABLE)
            .unwrap();

        simulation.deliver(Completion::new(Descriptor(3), READ_KEY, 0));

        // Arming completion was queued first.
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [
                ready(3, Readiness::WRITABLE),
                ready(3, Readiness::READABLE)
            ]
        );
    }

    #[test]
    fn cleared_interest_suppresses_reports() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend
            .set_interest(Descriptor(9), Readiness::READABLE)
            .unwrap();
        backend.clear_interest(Descriptor(9), Readiness::READABLE);

        // The read stays in flight, so the state does too.
        assert!(backend.socket(Descriptor(9)).unwrap().is_read_queued());

        simulation.deliver(Completion::new(Descriptor(9), READ_KEY, 0));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        assert!(backend.socket(Descriptor(9)).is_none());
    }

    #[test]
    fn clear_interest_is_idempotent() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.attach(Descriptor(9)).unwrap();
        backend
            .set_interest(Descriptor(9), Readiness::WRITABLE)
            .unwrap();

        backend.clear_interest(Descriptor(9), Readiness::WRITABLE);
        let once = backend.socket(Descriptor(9)).unwrap().interest();

        backend.clear_interest(Descriptor(9), Readiness::WRITABLE);
        let twice = backend.socket(Descriptor(9)).unwrap().interest();

        assert_eq!(once, twice);
        assert!(twice.is_empty());
    }

    #[test]
    fn clear_interest_on_untracked_socket_creates_nothing() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.clear_interest(Descriptor(4), Readiness::all());

        assert_eq!(backend.tracked_sockets(), 0);
    }

    #[test]
    fn completion_for_untracked_socket_is_skipped() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        simulation.deliver(Completion::new(Descriptor(42), OperationKey(0x100), 0));

        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert_eq!(backend.tracked_sockets(), 0);
    }

    #[test]
    fn wake_up_signal_is_not_reported() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.poster().wake().unwrap();

        assert!(backend.poll(None).unwrap().is_empty());
    }

    #[test]
    fn wait_failure_is_reported() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();

        simulation.fail_next_wait();

        let result = backend.poll(Some(Duration::ZERO));
        assert!(matches!(result, Err(Error::Wait(_))));

        // The completion is still there for the next poll.
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(7, Readiness::WRITABLE)]
        );
    }

    #[test]
    fn accepts_reported_and_held_in_order() {
        let _guard = log_to_console();

        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.listen(Descriptor(1)).unwrap();
        backend
            .set_interest(Descriptor(1), Readiness::READABLE)
            .unwrap();

        // Listening sockets never get a zero-byte read.
        assert!(!backend.socket(Descriptor(1)).unwrap().is_read_queued());

        for key in [0xA0, 0xB0, 0xC0] {
            backend
                .begin_accept(Descriptor(1), OperationKey(key))
                .unwrap();
        }

        assert!(
            backend
                .socket(Descriptor(1))
                .unwrap()
                .flags()
                .contains(SocketFlags::ACCEPT_PENDING)
        );

        for key in [0xA0, 0xB0, 0xC0] {
            simulation.deliver(Completion::new(Descriptor(1), OperationKey(key), 0));
        }

        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [
                ready(1, Readiness::READABLE),
                ready(1, Readiness::READABLE),
                ready(1, Readiness::READABLE)
            ]
        );

        let state = backend.socket(Descriptor(1)).unwrap();
        assert_eq!(state.pending_accept_count(), 3);
        assert!(!state.flags().contains(SocketFlags::ACCEPT_PENDING));
        assert_eq!(backend.in_flight_operations(), 0);

        let taken: Vec<_> = std::iter::from_fn(|| backend.take_accepted(Descriptor(1)))
            .map(|accepted| accepted.operation())
            .collect();

        assert_eq!(
            taken,
            [OperationKey(0xA0), OperationKey(0xB0), OperationKey(0xC0)]
        );
    }

    #[test]
    fn accept_without_interest_is_held_silently() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.listen(Descriptor(1)).unwrap();
        backend
            .begin_accept(Descriptor(1), OperationKey(0xA0))
            .unwrap();

        simulation.deliver(Completion::failed(Descriptor(1), OperationKey(0xA0), 0x274D));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        let accepted = backend.take_accepted(Descriptor(1)).unwrap();
        assert!(matches!(
            accepted.result(),
            Err(Error::OperationFailed(0x274D))
        ));
    }

    #[test]
    fn listening_socket_preconditions() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend.listen(Descriptor(1)).unwrap();

        let result = backend.set_interest(Descriptor(1), Readiness::WRITABLE);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(
            !backend
                .socket(Descriptor(1))
                .unwrap()
                .interest()
                .contains(Readiness::WRITABLE)
        );

        let result = backend.begin_write(Descriptor(1), OperationKey(0x100), None);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        // A socket with a queued read cannot start listening.
        backend
            .set_interest(Descriptor(2), Readiness::READABLE)
            .unwrap();
        let result = backend.listen(Descriptor(2));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        // Accepts only make sense on listening sockets.
        let result = backend.begin_accept(Descriptor(2), OperationKey(0xA0));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn full_registry_rejects_new_sockets() {
        let options = BackendOptions::default().with_capacity(NonZeroUsize::new(2).unwrap());
        let (mut backend, _simulation) = new_backend(facade_with_reads(&[]), &options);

        backend.attach(Descriptor(1)).unwrap();
        backend.attach(Descriptor(2)).unwrap();

        let result = backend.set_interest(Descriptor(3), Readiness::WRITABLE);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(backend.tracked_sockets(), 2);
        assert_eq!(backend.in_flight_operations(), 0);

        // Known sockets keep working.
        backend
            .set_interest(Descriptor(2), Readiness::WRITABLE)
            .unwrap();
    }

    #[test]
    fn reserved_descriptor_rejected() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        let result = backend.attach(Descriptor(usize::MAX));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn state_kept_until_last_operation_drains() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[READ_KEY]), &BackendOptions::default());

        backend.attach(Descriptor(6)).unwrap();
        backend
            .set_interest(Descriptor(6), Readiness::READABLE | Readiness::WRITABLE)
            .unwrap();

        backend.detach(Descriptor(6));

        // Both the read and the arming write are in flight.
        assert!(backend.socket(Descriptor(6)).is_some());

        // The arming write drains first, the read is still queued.
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert!(backend.socket(Descriptor(6)).is_some());

        simulation.deliver(Completion::new(Descriptor(6), READ_KEY, 0));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert!(backend.socket(Descriptor(6)).is_none());
    }

    #[test]
    fn detach_idle_socket_deletes_immediately() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.attach(Descriptor(6)).unwrap();
        backend.detach(Descriptor(6));
        backend.detach(Descriptor(6));

        assert_eq!(backend.tracked_sockets(), 0);
    }

    #[test]
    fn odd_operation_keys_are_reserved() {
        let (mut backend, _simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        let result = backend.begin_write(Descriptor(3), OperationKey(1), None);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(backend.socket(Descriptor(3)).is_none());

        backend.listen(Descriptor(1)).unwrap();
        let result = backend.begin_accept(Descriptor(1), OperationKey(0xA1));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        assert_eq!(backend.in_flight_operations(), 0);
    }

    #[test]
    fn writable_arming_does_not_disturb_real_writes() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.attach(Descriptor(3)).unwrap();
        backend
            .begin_write(Descriptor(3), OperationKey(0x100), None)
            .unwrap();

        backend.attach(Descriptor(4)).unwrap();
        backend
            .set_interest(Descriptor(4), Readiness::WRITABLE)
            .unwrap();
        backend
            .set_interest(Descriptor(3), Readiness::WRITABLE)
            .unwrap();

        assert_eq!(backend.in_flight_operations(), 2);
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(4, Readiness::WRITABLE)]
        );
        assert_eq!(backend.socket(Descriptor(3)).unwrap().pending_write_count(), 1);

        simulation.deliver(Completion::new(Descriptor(3), OperationKey(0x100), 10));
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(3, Readiness::WRITABLE)]
        );

        assert_eq!(backend.socket(Descriptor(3)).unwrap().pending_write_count(), 0);
        assert_eq!(backend.in_flight_operations(), 0);
    }

    #[test]
    fn accept_completing_after_detach_is_released() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend.listen(Descriptor(1)).unwrap();
        backend
            .begin_accept(Descriptor(1), OperationKey(0xA0))
            .unwrap();
        backend.detach(Descriptor(1));

        assert_eq!(backend.tracked_sockets(), 0);
        assert_eq!(backend.in_flight_operations(), 1);

        simulation.deliver(Completion::new(Descriptor(1), OperationKey(0xA0), 0));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        assert_eq!(backend.tracked_sockets(), 0);
        assert_eq!(backend.in_flight_operations(), 0);
    }

    #[test]
    fn completion_for_operation_of_another_socket_is_ignored() {
        let (mut backend, simulation) =
            new_backend(facade_with_reads(&[]), &BackendOptions::default());

        backend
            .begin_write(Descriptor(7), OperationKey(0x100), None)
            .unwrap();
        backend
            .begin_write(Descriptor(8), OperationKey(0x200), None)
            .unwrap();

        simulation.deliver(Completion::new(Descriptor(8), OperationKey(0x100), 10));
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());

        assert_eq!(backend.socket(Descriptor(7)).unwrap().pending_write_count(), 1);
        assert_eq!(backend.socket(Descriptor(8)).unwrap().pending_write_count(), 1);
        assert_eq!(backend.in_flight_operations(), 2);
    }

    #[test]
    fn single_drain_mode_takes_one_completion_per_poll() {
        let options = BackendOptions::default().with_drain_mode(crate::DrainMode::Single);
        let (mut backend, _simulation) = new_backend(facade_with_reads(&[]), &options);

        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();
        backend
            .set_interest(Descriptor(8), Readiness::WRITABLE)
            .unwrap();

        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(7, Readiness::WRITABLE)]
        );
        assert_eq!(
            backend.poll(Some(Duration::ZERO)).unwrap(),
            [ready(8, Readiness::WRITABLE)]
        );
    }

    #[test]
    fn drain_bounded_by_capacity() {
        let options = BackendOptions::default().with_capacity(NonZeroUsize::new(2).unwrap());
        let (mut backend, simulation) = new_backend(facade_with_reads(&[]), &options);

        backend
            .set_interest(Descriptor(7), Readiness::WRITABLE)
            .unwrap();
        backend
            .set_interest(Descriptor(8), Readiness::WRITABLE)
            .unwrap();
        backend.poster().wake().unwrap();

        assert_eq!(backend.poll(Some(Duration::ZERO)).unwrap().len(), 2);

        // The wake-up signal was not drained by the first poll.
        assert_eq!(simulation.pending(), 1);
        assert!(backend.poll(Some(Duration::ZERO)).unwrap().is_empty());
        assert_eq!(simulation.pending(), 0);
    }

    #[test]
    fn facade_released_on_drop() {
        let mut facade = MockSocketFacade::new();
        facade.expect_release().times(1).return_const(());

        let (backend, _simulation) = new_backend(facade, &BackendOptions::default());

        drop(backend);
    }

    #[test]
    fn backend_is_single_threaded() {
        assert_not_impl_any!(IocpBackend<MockSocketFacade>: Send, Sync);
    }
}
