use bulkload::error::ErrorKind;
use bulkload::failpoints::BATCH_WORKER_BEFORE_FLUSH;
use bulkload::store::memory::MemoryStore;
use bulkload::test_utils::failpoints::CustomFailScenario;
use bulkload::test_utils::pipeline::{create_memory_loader, test_pipeline_config};
use bulkload_config::shared::FlushErrorPolicy;
use bulkload_telemetry::tracing::init_test_tracing;

fn rows(count: usize) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["id".to_string()]];
    rows.extend((0..count).map(|row| vec![row.to_string()]));
    rows
}

#[tokio::test(flavor = "multi_thread")]
async fn injected_store_failure_aborts_the_load() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(BATCH_WORKER_BEFORE_FLUSH, "return(store)")]);
    let store = MemoryStore::new();

    let loader = create_memory_loader(rows(10), test_pipeline_config(1, 4, 1000), store.clone());
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::StoreExecutionFailed]);
    assert_eq!(store.executions().await, 0);
    assert_eq!(store.acquired().await, store.released().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn injected_failure_after_first_flush_keeps_written_rows() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        BATCH_WORKER_BEFORE_FLUSH,
        "1*off->return(injected)",
    )]);
    let store = MemoryStore::new();

    let loader = create_memory_loader(rows(10), test_pipeline_config(1, 4, 1000), store.clone());
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::InjectedFault]);
    assert_eq!(store.params().await, vec!["0", "1", "2", "3"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn injected_failure_with_continue_policy_is_reported_at_the_end() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        BATCH_WORKER_BEFORE_FLUSH,
        "1*return(store)->off",
    )]);
    let store = MemoryStore::new();

    let mut pipeline = test_pipeline_config(2, 4, 1000);
    pipeline.on_flush_error = FlushErrorPolicy::Continue;

    let loader = create_memory_loader(rows(20), pipeline, store.clone());
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::StoreExecutionFailed]);
    assert_eq!(store.params().await.len(), 16);
    assert_eq!(store.released().await, 2);
}
