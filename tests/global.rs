mod common;

use std::sync::Arc;

use ambient_unit_of_work::adapter::store::memory::MemoryDataSource;
use ambient_unit_of_work::{
    add_transactional_data_source, data_source_by_name, delete_data_source_by_name,
    initialize_transactional_context, run_in_transaction, run_on_transaction_commit,
    ConfigurationError, StorageMode, TransactionOptions, TransactionalError,
    TransactionalOptions,
};
use common::TestError;

// The process-wide context can be set only once, so the whole lifecycle lives
// in a single test.
#[tokio::test]
async fn process_wide_context_lifecycle() {
    let before: Result<(), TestError> =
        run_in_transaction(TransactionOptions::default(), async { Ok(()) }).await;
    assert!(matches!(
        before,
        Err(TestError::Transactional(TransactionalError::Configuration(
            ConfigurationError::NotInitialized
        )))
    ));
    assert!(run_on_transaction_commit(|| {}).is_err());
    assert!(data_source_by_name("default").is_none());
    assert!(!delete_data_source_by_name("default"));

    let context = initialize_transactional_context(TransactionalOptions {
        storage_mode: StorageMode::ExplicitStack,
        ..TransactionalOptions::default()
    });
    let again = initialize_transactional_context(TransactionalOptions::default());
    assert!(Arc::ptr_eq(&context, &again));
    assert_eq!(again.storage_mode(), StorageMode::ExplicitStack);

    let engine = Arc::new(MemoryDataSource::new());
    let data_source = add_transactional_data_source("default", engine.clone(), true).unwrap();
    assert!(data_source_by_name("default").is_some());

    let (tx, rx) = tokio::sync::oneshot::channel();
    run_in_transaction(TransactionOptions::default(), async {
        data_source.execute("INSERT INTO audit DEFAULT VALUES", Vec::new()).await?;
        run_on_transaction_commit(move || {
            let _ = tx.send(());
        })?;
        Ok::<_, TestError>(())
    })
    .await
    .unwrap();

    rx.await.unwrap();
    assert_eq!(engine.committed_queries(), vec!["INSERT INTO audit DEFAULT VALUES"]);

    assert!(delete_data_source_by_name("default"));
    assert!(data_source_by_name("default").is_none());
}
