use std::time::Duration;

use serde::Deserialize;

use crate::{defaults::DEFAULT_CALL_TIMEOUT, error::CredexError};

/// Behaviour of a [`Runtime`](crate::Runtime) that is independent of the
/// native library's own configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How long a native call may stay pending before it is abandoned.
    ///
    /// `None` waits for the completion indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuntimeConfig {
    #[serde(default = "default_call_timeout_ms")]
    call_timeout_ms: Option<u64>,
}

#[allow(clippy::unnecessary_wraps, clippy::cast_possible_truncation)]
const fn default_call_timeout_ms() -> Option<u64> {
    Some(DEFAULT_CALL_TIMEOUT.as_millis() as u64)
}

impl RuntimeConfig {
    /// Parses a configuration document such as `{"call_timeout_ms": 5000}`.
    ///
    /// A missing `call_timeout_ms` keeps the default timeout; `null` disables it.
    ///
    /// # Errors
    ///
    /// Returns [`CredexError::InvalidInput`] if the document is not valid JSON
    /// or contains unknown keys.
    pub fn from_json(json: &str) -> Result<Self, CredexError> {
        let raw: RawRuntimeConfig =
            serde_json::from_str(json).map_err(|err| CredexError::InvalidInput {
                reason: format!("invalid runtime config: {err}"),
            })?;

        Ok(Self {
            call_timeout: raw.call_timeout_ms.map(Duration::from_millis),
        })
    }

    /// Returns a copy with a different call timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}
