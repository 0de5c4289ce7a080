use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{info, warn};

use crate::{
    config::RuntimeConfig,
    dispatch::{Dispatcher, RegistryStats},
    error::{CredexError, Result},
    native::{ops, InMemoryLibrary, NativeArg, NativeLibrary},
};

/// Owns the native library and the dispatcher routing its completions.
///
/// Create one per process, call [`Runtime::init`] once, then hand it to the
/// entity constructors. Every entity keeps the runtime alive until it is
/// dropped.
#[derive(Debug)]
pub struct Runtime {
    library: Arc<dyn NativeLibrary>,
    dispatcher: Dispatcher,
    initialized: AtomicBool,
    config: RuntimeConfig,
}

impl Runtime {
    /// Wraps `library` and starts routing its completions.
    #[must_use]
    pub fn new(library: Arc<dyn NativeLibrary>, config: RuntimeConfig) -> Arc<Self> {
        let dispatcher = Dispatcher::new(Arc::clone(&library), config.call_timeout);
        library.attach(dispatcher.bridge());

        Arc::new(Self {
            library,
            dispatcher,
            initialized: AtomicBool::new(false),
            config,
        })
    }

    /// A runtime backed by a fresh [`InMemoryLibrary`].
    #[must_use]
    pub fn in_memory(config: RuntimeConfig) -> Arc<Self> {
        Self::new(Arc::new(InMemoryLibrary::new()), config)
    }

    /// A runtime backed by the linked native library.
    ///
    /// # Errors
    ///
    /// Returns [`CredexError::Protocol`] if the native entry points cannot be bound.
    #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
    pub fn native(config: RuntimeConfig) -> Result<Arc<Self>> {
        let library = crate::native::SystemLibrary::new()?;
        Ok(Self::new(Arc::new(library), config))
    }

    /// Initializes the native library with its configuration.
    ///
    /// `config` is either [`TEST_MODE_CONFIG`](crate::TEST_MODE_CONFIG) or the
    /// native library's JSON configuration.
    ///
    /// # Errors
    ///
    /// - [`CredexError::AlreadyInitialized`] if the library was initialized
    ///   before. The runtime stays usable.
    /// - [`CredexError::InvalidConfiguration`] if the library rejects `config`.
    pub async fn init(&self, config: &str) -> Result<()> {
        match self
            .dispatcher
            .invoke::<()>(&ops::INIT, vec![NativeArg::Str(config.to_string())])
            .await
        {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                info!("native library initialized");
                Ok(())
            }
            Err(CredexError::AlreadyInitialized) => {
                self.initialized.store(true, Ordering::Release);
                warn!("native library was already initialized");
                Err(CredexError::AlreadyInitialized)
            }
            Err(err) => Err(err),
        }
    }

    /// Whether [`Runtime::init`] has completed (successfully or with
    /// [`CredexError::AlreadyInitialized`]).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Fails every in-flight call with [`CredexError::ShutDown`], rejects new
    /// calls and stops routing completions. Returns the number of calls that
    /// were still pending.
    pub fn shutdown(&self) -> usize {
        let failed = self.dispatcher.registry().close();
        self.library.detach();
        info!(failed, "runtime shut down");
        failed
    }

    /// Whether [`Runtime::shutdown`] has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.dispatcher.registry().is_closed()
    }

    /// Number of native calls waiting for a completion.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.dispatcher.registry().pending_count()
    }

    /// Counters of the completion registry.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.dispatcher.registry().stats()
    }

    /// The dispatcher issuing native calls.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The configuration the runtime was built with.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.library.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::{
        defaults::TEST_MODE_CONFIG,
        dispatch::CompletionBridge,
        native::Operation,
        types::{CommandHandle, Handle},
    };

    /// Counts how often the runtime hands back the completion route.
    #[derive(Debug, Default)]
    struct DetachCounter {
        inner: InMemoryLibrary,
        detached: AtomicUsize,
    }

    impl NativeLibrary for DetachCounter {
        fn invoke(
            &self,
            command_handle: CommandHandle,
            operation: &'static Operation,
            args: Vec<NativeArg>,
            completion: CompletionBridge,
        ) -> u32 {
            self.inner.invoke(command_handle, operation, args, completion)
        }

        fn release(&self, operation: &'static Operation, handle: Handle) -> u32 {
            self.inner.release(operation, handle)
        }

        fn detach(&self) {
            self.detached.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test]
    async fn test_init_once() {
        let runtime = Runtime::in_memory(RuntimeConfig::default());
        assert!(!runtime.is_initialized());

        runtime.init(TEST_MODE_CONFIG).await.unwrap();
        assert!(runtime.is_initialized());

        let again = runtime.init(TEST_MODE_CONFIG).await;
        assert_eq!(again, Err(CredexError::AlreadyInitialized));
        assert!(runtime.is_initialized());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_calls() {
        let runtime = Runtime::in_memory(RuntimeConfig::default());
        assert_eq!(runtime.shutdown(), 0);
        assert!(runtime.is_shut_down());

        let result = runtime.init(TEST_MODE_CONFIG).await;
        assert_eq!(result, Err(CredexError::ShutDown));
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_calls() {
        let library = Arc::new(InMemoryLibrary::new());
        library.set_drop_completions(true);
        let runtime = Runtime::new(library, RuntimeConfig::default().with_call_timeout(None));

        let pending = tokio::spawn({
            let runtime = Arc::clone(&runtime);
            async move { runtime.init(TEST_MODE_CONFIG).await }
        });
        while runtime.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(runtime.shutdown(), 1);
        assert_eq!(pending.await.unwrap(), Err(CredexError::ShutDown));
        assert_eq!(runtime.stats().abandoned, 1);
    }

    #[test]
    fn test_drop_detaches_once() {
        let library = Arc::new(DetachCounter::default());
        drop(Runtime::new(library.clone(), RuntimeConfig::default()));
        assert_eq!(library.detached.load(Ordering::Relaxed), 1);

        let library = Arc::new(DetachCounter::default());
        let runtime = Runtime::new(library.clone(), RuntimeConfig::default());
        runtime.shutdown();
        drop(runtime);
        assert_eq!(library.detached.load(Ordering::Relaxed), 1);
    }
}
