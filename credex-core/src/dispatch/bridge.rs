use std::sync::Arc;

use super::registry::PendingRegistry;
use crate::{native::CompletionPayload, types::CommandHandle};

/// Entry point the native library uses to report completions.
///
/// Cheap to clone and safe to call from any thread, including threads the
/// native library owns. Completing wakes the waiting task on its own
/// scheduler; nothing runs on the calling thread besides the registry lookup.
#[derive(Debug, Clone)]
pub struct CompletionBridge {
    registry: Arc<PendingRegistry>,
}

impl CompletionBridge {
    pub(crate) const fn new(registry: Arc<PendingRegistry>) -> Self {
        Self { registry }
    }

    /// Delivers the completion for `command_handle`.
    ///
    /// `code` is the native result code; `payload` is ignored when it is
    /// non-zero. Completions for command handles that are not pending (late,
    /// duplicated or never issued) are logged and dropped. Returns whether a
    /// waiting call was resolved.
    pub fn complete(&self, command_handle: CommandHandle, code: u32, payload: CompletionPayload) -> bool {
        self.registry.resolve(command_handle, code, payload)
    }

    /// Whether a call is still waiting on `command_handle`.
    #[must_use]
    pub fn is_pending(&self, command_handle: CommandHandle) -> bool {
        self.registry.is_pending(command_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::ops;

    #[tokio::test]
    async fn test_complete_from_foreign_thread() {
        let registry = Arc::new(PendingRegistry::new());
        let bridge = CompletionBridge::new(Arc::clone(&registry));
        let (ticket, rx) = registry.register(&ops::CONNECTION_INVITE_DETAILS).unwrap();

        let foreign = bridge.clone();
        std::thread::spawn(move || {
            assert!(foreign.complete(
                ticket.command_handle,
                0,
                CompletionPayload::Text(Some("{}".to_string()))
            ));
        })
        .join()
        .unwrap();

        assert_eq!(
            rx.await.unwrap().unwrap(),
            CompletionPayload::Text(Some("{}".to_string()))
        );
        assert!(!bridge.is_pending(ticket.command_handle));
    }
}
