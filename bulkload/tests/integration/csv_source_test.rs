use std::io::Write;

use bulkload::pipeline::{LoadConfig, Loader};
use bulkload::source::csv::CsvSource;
use bulkload::store::memory::MemoryStore;
use bulkload::test_utils::pipeline::{TEST_TABLE, test_pipeline_config};
use bulkload_telemetry::tracing::init_test_tracing;
use tempfile::NamedTempFile;

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test(flavor = "multi_thread")]
async fn csv_file_is_loaded_into_the_store() {
    init_test_tracing();
    let file = write_csv("name,tld\nexample,com\n\"comma, inside\",org\nrust-lang,org\n");
    let store = MemoryStore::new();

    let loader = Loader::new(
        LoadConfig {
            table: TEST_TABLE.to_string(),
            pipeline: test_pipeline_config(1, 8, 1000),
        },
        CsvSource::open(file.path(), b',').unwrap(),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 3);

    let executed = store.executed().await;
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0].statement,
        "insert into domain (name,tld) values (?,?), (?,?), (?,?)"
    );
    assert_eq!(
        executed[0].params,
        vec![
            "example",
            "com",
            "comma, inside",
            "org",
            "rust-lang",
            "org"
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn csv_file_with_custom_delimiter_is_split_on_it() {
    init_test_tracing();
    let file = write_csv("a;b\n1;2\n");
    let store = MemoryStore::new();

    let loader = Loader::new(
        LoadConfig {
            table: "pairs".to_string(),
            pipeline: test_pipeline_config(2, 8, 1000),
        },
        CsvSource::open(file.path(), b';').unwrap(),
        store.clone(),
    );
    loader.run().await.unwrap();

    let executed = store.executed().await;
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].statement, "insert into pairs (a,b) values (?,?)");
    assert_eq!(executed[0].params, vec!["1", "2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_csv_file_loads_nothing() {
    init_test_tracing();
    let file = write_csv("");
    let store = MemoryStore::new();

    let loader = Loader::new(
        LoadConfig {
            table: TEST_TABLE.to_string(),
            pipeline: test_pipeline_config(2, 8, 1000),
        },
        CsvSource::open(file.path(), b',').unwrap(),
        store.clone(),
    );
    let stats = loader.run().await.unwrap();

    assert_eq!(stats.rows_read, 0);
    assert_eq!(store.executions().await, 0);
}
