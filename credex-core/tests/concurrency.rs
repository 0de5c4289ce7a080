//! Completion routing under out-of-order, late, duplicated and missing
//! completions.

mod common;

use std::{sync::Arc, time::Duration};

use credex_core::{
    native::DeliveryMode, Connection, CredexError, EntityKind, InMemoryLibrary, RuntimeConfig,
    Schema, State,
};

fn worker_library() -> Arc<InMemoryLibrary> {
    Arc::new(
        InMemoryLibrary::builder()
            .delivery(DeliveryMode::WorkerThread)
            .max_latency(Duration::from_millis(20))
            .build(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_out_of_order_completions_reach_their_callers() {
    let library = worker_library();
    let runtime = common::runtime_over(&library, RuntimeConfig::default()).await;

    let tasks: Vec<_> = (0..24)
        .map(|i| {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move {
                let source_id = format!("conn-{i}");
                let connection = Connection::create(&runtime, &source_id).await?;
                let record = connection.serialize().await?;
                Ok::<_, CredexError>((source_id, record.source_id))
            })
        })
        .collect();

    for task in tasks {
        let (requested, stored) = task.await.unwrap().unwrap();
        assert_eq!(requested, stored);
    }

    let stats = runtime.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.registered, stats.completed);
}

#[tokio::test]
async fn test_missing_completion_times_out() {
    let library = Arc::new(InMemoryLibrary::new());
    let config = RuntimeConfig::default().with_call_timeout(Some(Duration::from_millis(50)));
    let runtime = common::runtime_over(&library, config).await;

    library.set_drop_completions(true);
    let err = Connection::create(&runtime, "lost").await.unwrap_err();
    assert!(matches!(err, CredexError::Timeout { .. }), "{err:?}");
    assert_eq!(runtime.pending_calls(), 0);
    assert_eq!(runtime.stats().abandoned, 1);

    // The runtime keeps working once completions flow again.
    library.set_drop_completions(false);
    Connection::create(&runtime, "found").await.unwrap();
}

#[tokio::test]
async fn test_duplicate_completions_are_counted_as_stale() {
    let library = Arc::new(InMemoryLibrary::new());
    let runtime = common::runtime_over(&library, RuntimeConfig::default()).await;

    library.set_duplicate_completions(true);
    let connection = Connection::create(&runtime, "twice").await.unwrap();
    assert_eq!(connection.get_state().await, Ok(State::Initialized));

    assert_eq!(runtime.stats().stale, 2);
}

#[tokio::test]
async fn test_handle_evicted_on_the_native_side() {
    let (runtime, library) = common::setup().await;
    let mut connection = Connection::create(&runtime, "evicted").await.unwrap();
    assert!(library.evict(connection.handle()));

    assert_eq!(
        connection.update_state().await,
        Err(CredexError::InvalidHandle {
            kind: EntityKind::Connection
        })
    );
    // The cached state is kept; only a successful refresh replaces it.
    assert_eq!(connection.state(), State::Initialized);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_fails_in_flight_calls() {
    let library = Arc::new(InMemoryLibrary::new());
    let config = RuntimeConfig::default().with_call_timeout(None);
    let runtime = common::runtime_over(&library, config).await;
    library.set_drop_completions(true);

    let pending = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { Schema::lookup(&runtime, "never", 22).await.map(|_| ()) }
    });
    while runtime.pending_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(runtime.shutdown(), 1);
    assert_eq!(pending.await.unwrap(), Err(CredexError::ShutDown));
    assert_eq!(
        Connection::create(&runtime, "late").await.unwrap_err(),
        CredexError::ShutDown
    );
}
