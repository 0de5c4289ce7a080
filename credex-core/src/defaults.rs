use std::time::Duration;

/// Upper bound on how long a single native call may take to complete.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration string that puts the native library into test mode, where no
/// agency or ledger is contacted.
pub const TEST_MODE_CONFIG: &str = "ENABLE_TEST_MODE";

/// Upper bound on the simulated completion latency of the in-process library
/// when it delivers completions from a worker thread.
pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_millis(5);

