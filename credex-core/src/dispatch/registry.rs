//! Registry of native calls waiting for their completion.
//!
//! Flow:
//! 1. The dispatcher calls [`PendingRegistry::register`] and gets a [`Ticket`]
//!    plus a oneshot receiver.
//! 2. The dispatcher hands the ticket's command handle to the native library.
//! 3. The completion bridge calls [`PendingRegistry::resolve`] when the
//!    native library reports back.
//! 4. The dispatcher awaits the receiver, or abandons the ticket on timeout
//!    or cancellation.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{
    error::{CredexError, Result},
    native::{CompletionPayload, Operation},
    types::CommandHandle,
};

/// What a waiting caller eventually receives.
pub(crate) type Outcome = Result<CompletionPayload>;

/// A call waiting for its completion.
#[derive(Debug)]
struct PendingCompletion {
    /// Resumes the waiting caller.
    sender: oneshot::Sender<Outcome>,
    /// Operation that was issued (for shape checks and logging).
    operation: &'static Operation,
    /// Distinguishes this registration from earlier ones that used the same
    /// command handle.
    generation: u64,
    issued_at: Instant,
}

/// Proof of a registration, used to abandon exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    /// The command handle passed to the native library.
    pub command_handle: CommandHandle,
    generation: u64,
}

#[derive(Debug, Default)]
struct Counters {
    registered: AtomicU64,
    completed: AtomicU64,
    abandoned: AtomicU64,
    stale: AtomicU64,
}

/// Point-in-time statistics of a [`PendingRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, uniffi::Record)]
pub struct RegistryStats {
    /// Calls registered so far.
    pub registered: u64,
    /// Calls resolved by a completion.
    pub completed: u64,
    /// Calls abandoned by timeout, cancellation, immediate failure or shutdown.
    pub abandoned: u64,
    /// Completions that matched no pending call (late, duplicate or unknown).
    pub stale: u64,
    /// Calls currently waiting for a completion.
    pub pending: u64,
}

/// Concurrent map from [`CommandHandle`] to the caller waiting on it.
#[derive(Debug)]
pub struct PendingRegistry {
    pending: DashMap<CommandHandle, PendingCompletion>,
    next_handle: AtomicU32,
    next_generation: AtomicU64,
    closed: AtomicBool,
    counters: Counters,
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRegistry {
    /// Creates an empty registry whose first command handle is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an empty registry whose command handle counter starts at
    /// `first`. Zero is still never handed out.
    #[must_use]
    pub fn starting_at(first: u32) -> Self {
        Self {
            pending: DashMap::new(),
            next_handle: AtomicU32::new(first),
            next_generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Registers a new pending call for `operation`.
    ///
    /// The command handle is taken from a wrapping counter, skipping zero and
    /// every handle that is still pending.
    ///
    /// # Errors
    ///
    /// Returns [`CredexError::ShutDown`] once [`PendingRegistry::close`] has run.
    pub(crate) fn register(
        &self,
        operation: &'static Operation,
    ) -> Result<(Ticket, oneshot::Receiver<Outcome>)> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CredexError::ShutDown);
        }

        let (sender, receiver) = oneshot::channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        loop {
            let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
            if raw == 0 {
                continue;
            }
            let command_handle = CommandHandle::new(raw);

            match self.pending.entry(command_handle) {
                Entry::Occupied(_) => {
                    debug!(command_handle = %command_handle, "command handle still pending, skipping");
                }
                Entry::Vacant(slot) => {
                    slot.insert(PendingCompletion {
                        sender,
                        operation,
                        generation,
                        issued_at: Instant::now(),
                    });
                    self.counters.registered.fetch_add(1, Ordering::Relaxed);

                    debug!(
                        command_handle = %command_handle,
                        operation = operation.name,
                        "registered pending call"
                    );

                    return Ok((
                        Ticket {
                            command_handle,
                            generation,
                        },
                        receiver,
                    ));
                }
            }
        }
    }

    /// Delivers a completion to the caller waiting on `command_handle`.
    ///
    /// Returns `false` if nothing was waiting; the completion is then logged
    /// and dropped.
    pub fn resolve(&self, command_handle: CommandHandle, code: u32, payload: CompletionPayload) -> bool {
        let Some((_, pending)) = self.pending.remove(&command_handle) else {
            self.counters.stale.fetch_add(1, Ordering::Relaxed);
            warn!(
                command_handle = %command_handle,
                code,
                "completion for unknown or abandoned command handle"
            );
            return false;
        };

        let operation = pending.operation;
        let outcome = if code != 0 {
            Err(CredexError::from_native_code(code))
        } else if payload.shape() == operation.shape {
            Ok(payload)
        } else {
            Err(CredexError::protocol(
                operation.name,
                format!(
                    "completion shape {:?} does not match {:?}",
                    payload.shape(),
                    operation.shape
                ),
            ))
        };

        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        let elapsed = pending.issued_at.elapsed();

        if pending.sender.send(outcome).is_err() {
            // The caller went away between our removal and its own cleanup.
            debug!(
                command_handle = %command_handle,
                operation = operation.name,
                "waiting caller dropped before completion"
            );
        } else {
            debug!(
                command_handle = %command_handle,
                operation = operation.name,
                code,
                elapsed = ?elapsed,
                "completed pending call"
            );
        }

        true
    }

    /// Removes the registration behind `ticket` if it is still pending.
    ///
    /// A registration that reused the same command handle later is left
    /// alone.
    pub(crate) fn abandon(&self, ticket: Ticket) -> bool {
        let removed = self
            .pending
            .remove_if(&ticket.command_handle, |_, pending| {
                pending.generation == ticket.generation
            });

        match removed {
            Some((command_handle, pending)) => {
                self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                debug!(
                    command_handle = %command_handle,
                    operation = pending.operation.name,
                    "abandoned pending call"
                );
                true
            }
            None => false,
        }
    }

    /// Rejects new registrations and fails every pending call with
    /// [`CredexError::ShutDown`]. Returns the number of calls failed.
    pub(crate) fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);

        let command_handles: Vec<CommandHandle> =
            self.pending.iter().map(|entry| *entry.key()).collect();

        let mut failed = 0;
        for command_handle in command_handles {
            if let Some((_, pending)) = self.pending.remove(&command_handle) {
                self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                let _ = pending.sender.send(Err(CredexError::ShutDown));
                failed += 1;
            }
        }

        if failed > 0 {
            warn!(failed, "registry closed with calls still pending");
        }
        failed
    }

    /// Whether [`PendingRegistry::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of calls currently waiting for a completion.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `command_handle` belongs to a pending call.
    #[must_use]
    pub fn is_pending(&self, command_handle: CommandHandle) -> bool {
        self.pending.contains_key(&command_handle)
    }

    /// Snapshot of the registry counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            registered: self.counters.registered.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
            pending: self.pending.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::ops;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = PendingRegistry::new();

        let (ticket, rx) = registry.register(&ops::CONNECTION_CREATE).unwrap();
        assert!(registry.is_pending(ticket.command_handle));
        assert_eq!(registry.pending_count(), 1);

        assert!(registry.resolve(ticket.command_handle, 0, CompletionPayload::U32(42)));

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap(), CompletionPayload::U32(42));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_with_error_code() {
        let registry = PendingRegistry::new();
        let (ticket, rx) = registry.register(&ops::CONNECTION_CONNECT).unwrap();

        registry.resolve(ticket.command_handle, 1005, CompletionPayload::Text(None));
        assert_eq!(rx.await.unwrap(), Err(CredexError::NotReady));
    }

    #[tokio::test]
    async fn test_resolve_shape_mismatch_is_protocol_error() {
        let registry = PendingRegistry::new();
        let (ticket, rx) = registry.register(&ops::CONNECTION_CREATE).unwrap();

        registry.resolve(
            ticket.command_handle,
            0,
            CompletionPayload::Text(Some("{}".to_string())),
        );
        assert!(matches!(rx.await.unwrap(), Err(CredexError::Protocol { .. })));
    }

    #[test]
    fn test_duplicate_and_unknown_completions_are_ignored() {
        let registry = PendingRegistry::new();
        let (ticket, _rx) = registry.register(&ops::INIT).unwrap();

        assert!(registry.resolve(ticket.command_handle, 0, CompletionPayload::Unit));
        assert!(!registry.resolve(ticket.command_handle, 0, CompletionPayload::Unit));
        assert!(!registry.resolve(CommandHandle::new(9999), 0, CompletionPayload::Unit));

        let stats = registry.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.stale, 2);
    }

    #[test]
    fn test_counter_skips_zero_on_wraparound() {
        let registry = PendingRegistry::starting_at(u32::MAX);

        let (first, _rx1) = registry.register(&ops::INIT).unwrap();
        let (second, _rx2) = registry.register(&ops::INIT).unwrap();

        assert_eq!(first.command_handle.get(), u32::MAX);
        assert_eq!(second.command_handle.get(), 1);
    }

    #[test]
    fn test_counter_skips_pending_handles() {
        let registry = PendingRegistry::starting_at(u32::MAX);
        let (held, _rx1) = registry.register(&ops::INIT).unwrap();
        assert_eq!(held.command_handle.get(), u32::MAX);

        // Wrap the counter all the way back onto the held handle.
        registry.next_handle.store(u32::MAX, Ordering::Relaxed);
        let (next, _rx2) = registry.register(&ops::INIT).unwrap();

        assert_ne!(next.command_handle, held.command_handle);
        assert_eq!(next.command_handle.get(), 1);
    }

    #[test]
    fn test_abandon_only_removes_own_registration() {
        let registry = PendingRegistry::starting_at(7);
        let (old, _rx1) = registry.register(&ops::INIT).unwrap();
        registry.resolve(old.command_handle, 0, CompletionPayload::Unit);

        // Reuse the same command handle for a new call.
        registry.next_handle.store(7, Ordering::Relaxed);
        let (new, _rx2) = registry.register(&ops::INIT).unwrap();
        assert_eq!(new.command_handle, old.command_handle);

        assert!(!registry.abandon(old));
        assert!(registry.is_pending(new.command_handle));
        assert!(registry.abandon(new));
        assert!(!registry.is_pending(new.command_handle));
    }

    #[tokio::test]
    async fn test_close_fails_pending_calls() {
        let registry = PendingRegistry::new();
        let (_ticket, rx) = registry.register(&ops::INIT).unwrap();

        assert_eq!(registry.close(), 1);
        assert_eq!(rx.await.unwrap(), Err(CredexError::ShutDown));
        assert!(registry.is_closed());
        assert!(matches!(
            registry.register(&ops::INIT),
            Err(CredexError::ShutDown)
        ));
    }
}
