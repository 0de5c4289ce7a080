use std::sync::Arc;

use crate::{
    config::RuntimeConfig, dispatch::RegistryStats, error::CredexError, runtime::Runtime,
};

/// A [`Runtime`] shared with foreign code.
#[derive(Debug, uniffi::Object)]
pub struct CredexRuntime(Arc<Runtime>);

impl CredexRuntime {
    pub(crate) const fn inner(&self) -> &Arc<Runtime> {
        &self.0
    }
}

fn parse_config(config_json: Option<String>) -> Result<RuntimeConfig, CredexError> {
    config_json.map_or_else(|| Ok(RuntimeConfig::default()), |json| RuntimeConfig::from_json(&json))
}

#[uniffi::export(async_runtime = "tokio")]
impl CredexRuntime {
    /// Creates a runtime backed by the in-process test-mode library.
    ///
    /// `config_json` is a [`RuntimeConfig`] in JSON form, for example
    /// `{"call_timeout_ms": 5000}`. Defaults apply when it is absent.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidInput`] if `config_json` does not parse.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub fn in_memory(config_json: Option<String>) -> Result<Self, CredexError> {
        Ok(Self(Runtime::in_memory(parse_config(config_json)?)))
    }

    /// Initializes the native library. Named `initialize` because `init` is
    /// reserved in Swift.
    ///
    /// # Errors
    ///
    /// See [`Runtime::init`].
    pub async fn initialize(&self, config: String) -> Result<(), CredexError> {
        self.0.init(&config).await
    }

    /// Whether the native library was initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.0.is_initialized()
    }

    /// Fails every in-flight call and rejects new ones. Returns the number of
    /// calls that were still pending.
    #[must_use]
    pub fn shutdown(&self) -> u64 {
        u64::try_from(self.0.shutdown()).unwrap_or(u64::MAX)
    }

    /// Counters of in-flight and finished native calls.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.0.stats()
    }
}

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
#[uniffi::export]
impl CredexRuntime {
    /// Creates a runtime backed by the linked native library.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidInput`] if `config_json` does not parse, or
    /// [`CredexError::Protocol`] if the native entry points cannot be bound.
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub fn native(config_json: Option<String>) -> Result<Self, CredexError> {
        Ok(Self(Runtime::native(parse_config(config_json)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::TEST_MODE_CONFIG;

    #[tokio::test]
    async fn test_runtime_lifecycle() {
        let runtime = CredexRuntime::in_memory(Some(r#"{"call_timeout_ms": 1000}"#.to_string()))
            .unwrap();
        runtime.initialize(TEST_MODE_CONFIG.to_string()).await.unwrap();
        assert!(runtime.is_initialized());
        assert_eq!(runtime.stats().completed, 1);
        assert_eq!(runtime.shutdown(), 0);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let result = CredexRuntime::in_memory(Some("{\"timeout\": 1}".to_string()));
        assert!(matches!(result, Err(CredexError::InvalidInput { .. })));
    }
}
