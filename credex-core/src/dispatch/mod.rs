//! Turns the native library's callback-based calls into awaitable futures.

use std::{sync::Arc, time::Duration};

use tracing::{debug, trace, warn};

use crate::{
    error::{CredexError, Result},
    native::{CompletionPayload, NativeArg, NativeLibrary, Operation},
    types::{Handle, State},
};

mod bridge;
pub use bridge::CompletionBridge;

mod registry;
pub use registry::{PendingRegistry, RegistryStats, Ticket};

/// Decodes the payload of a successful completion into a Rust value.
pub trait FromPayload: Sized {
    /// Converts `payload`, which was delivered for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`CredexError::Protocol`] if the payload does not carry the
    /// expected values.
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self>;
}

fn unexpected(operation: &Operation, payload: &CompletionPayload) -> CredexError {
    CredexError::protocol(operation.name, format!("unexpected payload {payload:?}"))
}

impl FromPayload for CompletionPayload {
    fn from_payload(_operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        Ok(payload)
    }
}

impl FromPayload for () {
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        match payload {
            CompletionPayload::Unit => Ok(()),
            other => Err(unexpected(operation, &other)),
        }
    }
}

impl FromPayload for u32 {
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        match payload {
            CompletionPayload::U32(value) => Ok(value),
            other => Err(unexpected(operation, &other)),
        }
    }
}

impl FromPayload for Handle {
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        u32::from_payload(operation, payload).map(Self::new)
    }
}

impl FromPayload for State {
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        let code = u32::from_payload(operation, payload)?;
        Self::from_code(code).ok_or_else(|| {
            CredexError::protocol(operation.name, format!("unknown state code {code}"))
        })
    }
}

impl FromPayload for String {
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        match payload {
            CompletionPayload::Text(Some(text)) => Ok(text),
            CompletionPayload::Text(None) => {
                Err(CredexError::protocol(operation.name, "null string payload"))
            }
            other => Err(unexpected(operation, &other)),
        }
    }
}

impl FromPayload for (u32, String) {
    fn from_payload(operation: &Operation, payload: CompletionPayload) -> Result<Self> {
        match payload {
            CompletionPayload::U32Text(value, Some(text)) => Ok((value, text)),
            CompletionPayload::U32Text(_, None) => {
                Err(CredexError::protocol(operation.name, "null string payload"))
            }
            other => Err(unexpected(operation, &other)),
        }
    }
}

/// Abandons a registration unless the call reached its completion.
struct PendingGuard<'a> {
    registry: &'a PendingRegistry,
    ticket: Option<Ticket>,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.ticket = None;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.registry.abandon(ticket);
        }
    }
}

/// Issues native operations and awaits their completions.
///
/// Any number of calls may be in flight at once; completions are matched to
/// callers by command handle and may arrive in any order.
#[derive(Debug)]
pub struct Dispatcher {
    library: Arc<dyn NativeLibrary>,
    registry: Arc<PendingRegistry>,
    bridge: CompletionBridge,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher with its own registry.
    #[must_use]
    pub fn new(library: Arc<dyn NativeLibrary>, call_timeout: Option<Duration>) -> Self {
        Self::with_registry(library, Arc::new(PendingRegistry::new()), call_timeout)
    }

    /// Creates a dispatcher around an existing registry.
    #[must_use]
    pub fn with_registry(
        library: Arc<dyn NativeLibrary>,
        registry: Arc<PendingRegistry>,
        call_timeout: Option<Duration>,
    ) -> Self {
        let bridge = CompletionBridge::new(Arc::clone(&registry));
        Self {
            library,
            registry,
            bridge,
            call_timeout,
        }
    }

    /// Issues `operation` and decodes its completion into `T`.
    ///
    /// # Errors
    ///
    /// - The mapped native error if the call fails immediately or its
    ///   completion carries a non-zero code.
    /// - [`CredexError::Timeout`] if no completion arrives within the call timeout.
    /// - [`CredexError::ShutDown`] if the runtime was shut down.
    /// - [`CredexError::Protocol`] if the completion payload is malformed.
    pub async fn invoke<T: FromPayload>(
        &self,
        operation: &'static Operation,
        args: Vec<NativeArg>,
    ) -> Result<T> {
        let payload = self.call(operation, args).await?;
        T::from_payload(operation, payload)
    }

    async fn call(
        &self,
        operation: &'static Operation,
        args: Vec<NativeArg>,
    ) -> Result<CompletionPayload> {
        let (ticket, receiver) = self.registry.register(operation)?;
        let guard = PendingGuard {
            registry: &self.registry,
            ticket: Some(ticket),
        };

        trace!(
            command_handle = %ticket.command_handle,
            operation = operation.name,
            "issuing native call"
        );

        let status =
            self.library
                .invoke(ticket.command_handle, operation, args, self.bridge.clone());
        if status != 0 {
            debug!(
                command_handle = %ticket.command_handle,
                operation = operation.name,
                status,
                "native call rejected immediately"
            );
            // No completion follows a non-zero status; the guard frees the slot.
            return Err(CredexError::from_native_code(status));
        }

        let received = match self.call_timeout {
            Some(limit) => {
                if let Ok(received) = tokio::time::timeout(limit, receiver).await {
                    received
                } else {
                    warn!(
                        command_handle = %ticket.command_handle,
                        operation = operation.name,
                        timeout = ?limit,
                        "native call timed out"
                    );
                    return Err(CredexError::Timeout {
                        operation: operation.name.to_string(),
                    });
                }
            }
            None => receiver.await,
        };
        guard.disarm();

        received.map_err(|_| CredexError::Abandoned {
            operation: operation.name.to_string(),
        })?
    }

    /// Synchronously releases a native object and returns the native status.
    pub fn release(&self, operation: &'static Operation, handle: Handle) -> u32 {
        self.library.release(operation, handle)
    }

    /// The registry tracking this dispatcher's pending calls.
    #[must_use]
    pub const fn registry(&self) -> &Arc<PendingRegistry> {
        &self.registry
    }

    /// The bridge completions for this dispatcher must be delivered to.
    #[must_use]
    pub const fn bridge(&self) -> &CompletionBridge {
        &self.bridge
    }

    /// The configured upper bound on a single call.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{native::ops, types::CommandHandle};

    /// A library that records calls and lets the test decide when to complete them.
    #[derive(Debug, Default)]
    struct ManualLibrary {
        issued: Mutex<Vec<(CommandHandle, &'static str)>>,
        immediate_status: u32,
    }

    impl NativeLibrary for ManualLibrary {
        fn invoke(
            &self,
            command_handle: CommandHandle,
            operation: &'static Operation,
            _args: Vec<NativeArg>,
            _completion: CompletionBridge,
        ) -> u32 {
            self.issued
                .lock()
                .unwrap()
                .push((command_handle, operation.name));
            self.immediate_status
        }

        fn release(&self, _operation: &'static Operation, _handle: Handle) -> u32 {
            0
        }
    }

    fn dispatcher(library: Arc<ManualLibrary>, timeout: Option<Duration>) -> Dispatcher {
        Dispatcher::new(library, timeout)
    }

    async fn wait_for_issue(library: &ManualLibrary, count: usize) -> Vec<CommandHandle> {
        loop {
            {
                let issued = library.issued.lock().unwrap();
                if issued.len() >= count {
                    return issued.iter().map(|(handle, _)| *handle).collect();
                }
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_out_of_order_completions() {
        let library = Arc::new(ManualLibrary::default());
        let dispatcher = Arc::new(dispatcher(Arc::clone(&library), None));

        let first = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                dispatcher
                    .invoke::<Handle>(&ops::CONNECTION_CREATE, vec![])
                    .await
            }
        });
        let issued = wait_for_issue(&library, 1).await;
        let second = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                dispatcher
                    .invoke::<Handle>(&ops::CONNECTION_CREATE, vec![])
                    .await
            }
        });
        let issued_both = wait_for_issue(&library, 2).await;
        assert_eq!(issued[0], issued_both[0]);

        // Complete the second call first.
        dispatcher
            .bridge()
            .complete(issued_both[1], 0, CompletionPayload::U32(20));
        dispatcher
            .bridge()
            .complete(issued_both[0], 0, CompletionPayload::U32(10));

        assert_eq!(first.await.unwrap().unwrap(), Handle::new(10));
        assert_eq!(second.await.unwrap().unwrap(), Handle::new(20));
        assert_eq!(dispatcher.registry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_immediate_failure_frees_slot() {
        let library = Arc::new(ManualLibrary {
            immediate_status: 1007,
            ..ManualLibrary::default()
        });
        let dispatcher = dispatcher(library, None);

        let result = dispatcher.invoke::<()>(&ops::INIT, vec![]).await;
        assert_eq!(result, Err(CredexError::InvalidOption));
        assert_eq!(dispatcher.registry().pending_count(), 0);
        assert_eq!(dispatcher.registry().stats().abandoned, 1);
    }

    #[tokio::test]
    async fn test_timeout_abandons_and_late_completion_is_ignored() {
        let library = Arc::new(ManualLibrary::default());
        let dispatcher = dispatcher(Arc::clone(&library), Some(Duration::from_millis(20)));

        let result = dispatcher
            .invoke::<State>(ops::PROOF.get_state, vec![])
            .await;
        assert!(matches!(result, Err(CredexError::Timeout { .. })));
        assert_eq!(dispatcher.registry().pending_count(), 0);

        let issued = wait_for_issue(&library, 1).await;
        assert!(!dispatcher
            .bridge()
            .complete(issued[0], 0, CompletionPayload::U32(1)));
        assert_eq!(dispatcher.registry().stats().stale, 1);
    }

    #[tokio::test]
    async fn test_cancelled_call_abandons_its_slot() {
        let library = Arc::new(ManualLibrary::default());
        let dispatcher = dispatcher(Arc::clone(&library), None);

        let call = dispatcher.invoke::<()>(&ops::INIT, vec![]);
        let cancelled = tokio::time::timeout(Duration::from_millis(10), call).await;
        assert!(cancelled.is_err());
        assert_eq!(dispatcher.registry().pending_count(), 0);
        assert_eq!(dispatcher.registry().stats().abandoned, 1);
    }

    #[tokio::test]
    async fn test_null_string_is_protocol_error() {
        let library = Arc::new(ManualLibrary::default());
        let dispatcher = Arc::new(dispatcher(Arc::clone(&library), None));

        let call = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                dispatcher
                    .invoke::<String>(&ops::CONNECTION_CONNECT, vec![])
                    .await
            }
        });
        let issued = wait_for_issue(&library, 1).await;
        dispatcher
            .bridge()
            .complete(issued[0], 0, CompletionPayload::Text(None));

        assert!(matches!(
            call.await.unwrap(),
            Err(CredexError::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_state_code_is_protocol_error() {
        let state = State::from_payload(&ops::INIT, CompletionPayload::U32(99));
        assert!(matches!(state, Err(CredexError::Protocol { .. })));
    }
}
