use std::time::Duration;

use bulkload::error::ErrorKind;
use bulkload::store::memory::{ExecutedStatement, MemoryStore};
use bulkload::test_utils::pipeline::{create_memory_loader, test_pipeline_config};
use bulkload_config::shared::{FlushErrorPolicy, MalformedRowPolicy};
use bulkload_telemetry::tracing::init_test_tracing;

fn numbered_rows(header: &[&str], rows: usize) -> Vec<Vec<String>> {
    let mut all = vec![header.iter().map(|column| column.to_string()).collect()];
    for row in 0..rows {
        all.push(
            (0..header.len())
                .map(|column| format!("{row}-{column}"))
                .collect(),
        );
    }
    all
}

fn expected_params(header: &[&str], rows: usize) -> Vec<String> {
    numbered_rows(header, rows).into_iter().skip(1).flatten().collect()
}

fn batch_sizes(executed: &[ExecutedStatement], columns: usize) -> Vec<usize> {
    executed
        .iter()
        .map(|executed| executed.params.len() / columns)
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn two_rows_are_written_in_a_single_insert() {
    init_test_tracing();
    let store = MemoryStore::new();

    let loader = create_memory_loader(
        vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]],
        test_pipeline_config(1, 8, 1000),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(
        store.executed().await,
        vec![ExecutedStatement {
            statement: "insert into domain (a,b) values (?,?), (?,?)".to_string(),
            params: vec!["1".into(), "2".into(), "3".into(), "4".into()],
        }]
    );
    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.rows_flushed, 2);
    assert_eq!(stats.batches_flushed, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn batches_never_exceed_max_size() {
    init_test_tracing();
    let header = ["a", "b", "c"];
    let store = MemoryStore::new();

    let loader = create_memory_loader(
        numbered_rows(&header, 20),
        test_pipeline_config(1, 8, 1000),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    let executed = store.executed().await;
    assert_eq!(batch_sizes(&executed, header.len()), vec![8, 8, 4]);
    assert_eq!(store.params().await, expected_params(&header, 20));
    assert_eq!(stats.rows_flushed, 20);
    assert_eq!(stats.batches_flushed, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn every_row_is_written_once_by_many_workers() {
    init_test_tracing();
    let header = ["id", "name"];
    let store = MemoryStore::new();

    let loader = create_memory_loader(
        numbered_rows(&header, 250),
        test_pipeline_config(4, 7, 50),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    let executed = store.executed().await;
    assert!(
        batch_sizes(&executed, header.len())
            .iter()
            .all(|size| (1..=7).contains(size))
    );

    let mut params = store.params().await;
    params.sort();
    let mut expected = expected_params(&header, 250);
    expected.sort();
    assert_eq!(params, expected);

    assert_eq!(stats.rows_read, 250);
    assert_eq!(stats.rows_flushed, 250);
    assert_eq!(store.acquired().await, 4);
    assert_eq!(store.released().await, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn header_only_source_writes_nothing() {
    init_test_tracing();
    let store = MemoryStore::new();

    let loader = create_memory_loader(
        vec![vec!["a", "b"]],
        test_pipeline_config(3, 8, 1000),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 0);
    assert_eq!(stats.batches_flushed, 0);
    assert_eq!(store.executions().await, 0);
    assert_eq!(store.acquired().await, store.released().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_source_never_connects() {
    init_test_tracing();
    let store = MemoryStore::new();

    let loader = create_memory_loader(
        Vec::<Vec<String>>::new(),
        test_pipeline_config(3, 8, 1000),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats, Default::default());
    assert_eq!(store.acquired().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn store_failure_aborts_the_load() {
    init_test_tracing();
    let header = ["a", "b"];
    let store = MemoryStore::failing_on_execution(1);

    let loader = create_memory_loader(
        numbered_rows(&header, 10),
        test_pipeline_config(1, 2, 1000),
        store.clone(),
    );
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::StoreExecutionFailed]);
    assert_eq!(store.executions().await, 1);
    assert!(store.executed().await.is_empty());
    assert_eq!(store.released().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn store_failure_stops_every_worker() {
    init_test_tracing();
    let header = ["a", "b"];
    let workers = 4;
    let failing_execution = 3;
    let store = MemoryStore::failing_on_execution(failing_execution);
    // Keeps the other workers busy writing when the failure happens.
    store.set_execution_delay(Duration::from_millis(5)).await;

    let loader = create_memory_loader(
        numbered_rows(&header, 2000),
        test_pipeline_config(workers, 2, 1000),
        store.clone(),
    );
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::StoreExecutionFailed]);

    // A write already in flight completes, but no worker starts another one.
    let executions = store.executions().await;
    assert!(executions >= failing_execution);
    assert!(
        executions < failing_execution + workers,
        "{executions} executions after the failure of execution {failing_execution}"
    );
    assert_eq!(store.executed().await.len(), executions - 1);

    assert_eq!(store.acquired().await, store.released().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn store_failure_with_continue_policy_keeps_other_workers_running() {
    init_test_tracing();
    let header = ["a", "b"];
    let store = MemoryStore::failing_on_execution(1);

    let mut pipeline = test_pipeline_config(2, 5, 1000);
    pipeline.on_flush_error = FlushErrorPolicy::Continue;

    let loader = create_memory_loader(numbered_rows(&header, 20), pipeline, store.clone());
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::StoreExecutionFailed]);
    // Only the rows of the failed batch are lost.
    assert_eq!(store.params().await.len(), 15 * header.len());
    assert_eq!(store.released().await, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_rows_are_skipped_by_default() {
    init_test_tracing();
    let store = MemoryStore::new();

    let loader = create_memory_loader(
        vec![
            vec!["a", "b"],
            vec!["1", "2"],
            vec!["3"],
            vec!["4", "5", "6"],
            vec!["7", "8"],
        ],
        test_pipeline_config(1, 8, 1000),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 4);
    assert_eq!(stats.rows_skipped, 2);
    assert_eq!(stats.rows_flushed, 2);
    assert_eq!(
        store.params().await,
        vec!["1".to_string(), "2".into(), "7".into(), "8".into()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_row_fails_the_load_when_rejected() {
    init_test_tracing();
    let store = MemoryStore::new();

    let mut pipeline = test_pipeline_config(1, 8, 1000);
    pipeline.malformed_rows = MalformedRowPolicy::Reject;

    let loader = create_memory_loader(
        vec![
            vec!["a", "b"],
            vec!["1", "2"],
            vec!["3", "4"],
            vec!["5"],
            vec!["7", "8"],
        ],
        pipeline,
        store.clone(),
    );
    let err = loader.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    assert!(store.executed().await.is_empty());
    assert_eq!(store.acquired().await, store.released().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn max_rows_stops_reading_the_source() {
    init_test_tracing();
    let header = ["a", "b"];
    let store = MemoryStore::new();

    let mut pipeline = test_pipeline_config(2, 8, 1000);
    pipeline.max_rows = Some(5);

    let loader = create_memory_loader(numbered_rows(&header, 12), pipeline, store.clone());
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 5);
    assert_eq!(stats.rows_flushed, 5);

    let mut params = store.params().await;
    params.sort();
    let mut expected = expected_params(&header, 5);
    expected.sort();
    assert_eq!(params, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn skipped_rows_count_toward_max_rows() {
    init_test_tracing();
    let store = MemoryStore::new();

    let mut pipeline = test_pipeline_config(1, 8, 1000);
    pipeline.max_rows = Some(3);

    let loader = create_memory_loader(
        vec![
            vec!["a", "b"],
            vec!["1", "2"],
            vec!["3"],
            vec!["4", "5"],
            vec!["6", "7"],
        ],
        pipeline,
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 3);
    assert_eq!(stats.rows_skipped, 1);
    assert_eq!(
        store.params().await,
        vec!["1".to_string(), "2".into(), "4".into(), "5".into()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn read_error_ends_the_input() {
    init_test_tracing();
    let store = MemoryStore::new();

    let source_rows = vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]];
    let loader = bulkload::pipeline::Loader::new(
        bulkload::pipeline::LoadConfig {
            table: "domain".to_string(),
            pipeline: test_pipeline_config(1, 8, 1000),
        },
        bulkload::source::memory::MemorySource::new(source_rows).with_read_error("truncated"),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 2);
    assert_eq!(
        store.params().await,
        vec!["1".to_string(), "2".into(), "3".into(), "4".into()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_acquisition_failure_fails_the_load() {
    init_test_tracing();
    let store = MemoryStore::failing_acquire();

    let loader = create_memory_loader(
        vec![vec!["a"], vec!["1"], vec!["2"]],
        test_pipeline_config(2, 8, 1000),
        store.clone(),
    );
    let err = loader.run().await.unwrap_err();

    assert!(err.kinds().contains(&ErrorKind::ConnectionAcquisitionFailed));
    assert_eq!(store.executions().await, 0);
}
