#![allow(dead_code)]

//! Common test utilities shared across integration tests.

use std::sync::Arc;

use credex_core::{
    logger, ConnectOptions, Connection, InMemoryLibrary, Runtime, RuntimeConfig, State,
    TEST_MODE_CONFIG,
};

/// Phone number used when connecting in tests.
pub const PHONE: &str = "8019119191";

/// Routes library logs to stderr; honours `RUST_LOG`.
pub fn init_logging() {
    logger::init_stderr_logging("warn");
}

/// An initialized runtime over `library`.
pub async fn runtime_over(library: &Arc<InMemoryLibrary>, config: RuntimeConfig) -> Arc<Runtime> {
    init_logging();
    let runtime = Runtime::new(library.clone(), config);
    runtime.init(TEST_MODE_CONFIG).await.expect("init");
    runtime
}

/// An initialized runtime together with the in-memory library behind it.
pub async fn setup() -> (Arc<Runtime>, Arc<InMemoryLibrary>) {
    let library = Arc::new(InMemoryLibrary::new());
    let runtime = runtime_over(&library, RuntimeConfig::default()).await;
    (runtime, library)
}

/// A connection the remote party has accepted.
pub async fn accepted_connection(
    runtime: &Arc<Runtime>,
    library: &InMemoryLibrary,
    source_id: &str,
) -> Connection {
    let mut connection = Connection::create(runtime, source_id).await.expect("create");
    connection
        .connect(ConnectOptions::sms(PHONE))
        .await
        .expect("connect");
    assert!(library.simulate_remote_state(connection.handle(), State::Accepted));
    assert_eq!(connection.update_state().await, Ok(State::Accepted));
    connection
}
