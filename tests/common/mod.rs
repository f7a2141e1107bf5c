#![allow(dead_code)]

use std::sync::Arc;

use ambient_unit_of_work::adapter::store::memory::MemoryDataSource;
use ambient_unit_of_work::{
    DataSource, StorageMode, TransactionError, TransactionalContext, TransactionalError,
    TransactionalOptions, DEFAULT_DATA_SOURCE,
};
use thiserror::Error;
use tokio::sync::mpsc;

pub const STORAGE_MODES: [StorageMode; 2] = [StorageMode::Native, StorageMode::ExplicitStack];

#[derive(Debug, Error)]
pub enum TestError {
    #[error(transparent)]
    Transactional(#[from] TransactionalError),

    #[error(transparent)]
    Engine(#[from] TransactionError),

    #[error("unit of work failed: {0}")]
    Work(String),
}

pub struct Fixture {
    pub context: Arc<TransactionalContext>,
    pub engine: Arc<MemoryDataSource>,
    /// The engine as returned by registration, routing through the ambient transaction.
    pub data_source: Arc<dyn DataSource>,
}

pub fn fixture(storage_mode: StorageMode) -> Fixture {
    fixture_with(storage_mode, MemoryDataSource::new())
}

pub fn fixture_with(storage_mode: StorageMode, engine: MemoryDataSource) -> Fixture {
    let context = TransactionalContext::new(TransactionalOptions {
        storage_mode,
        ..TransactionalOptions::default()
    });
    let engine = Arc::new(engine);
    let data_source = context
        .register_data_source(DEFAULT_DATA_SOURCE, engine.clone(), true)
        .unwrap();
    Fixture {
        context,
        engine,
        data_source,
    }
}

impl Fixture {
    pub fn current_id(&self) -> Option<u64> {
        self.context
            .current_transaction(DEFAULT_DATA_SOURCE)
            .map(|handle| handle.id())
    }
}

/// Records hook events of the innermost hook scope in firing order.
pub struct HookProbe {
    events: mpsc::UnboundedReceiver<String>,
}

impl HookProbe {
    pub fn attach(context: &TransactionalContext) -> Result<Self, TransactionalError> {
        let (tx, events) = mpsc::unbounded_channel();

        let sender = tx.clone();
        context.on_commit(move || {
            let _ = sender.send("commit".to_string());
        })?;
        let sender = tx.clone();
        context.on_rollback(move |failure| {
            let _ = sender.send(format!("rollback: {failure}"));
        })?;
        context.on_complete(move |failure| {
            let _ = tx.send(match failure {
                Some(failure) => format!("end: {failure}"),
                None => "end".to_string(),
            });
        })?;

        Ok(Self { events })
    }

    /// Waits for the `end` event and returns every event fired.
    pub async fn finish(mut self) -> Vec<String> {
        let mut seen = Vec::new();
        while let Some(event) = self.events.recv().await {
            let done = event.starts_with("end");
            seen.push(event);
            if done {
                break;
            }
        }
        assert!(self.events.try_recv().is_err(), "events fired after end");
        seen
    }
}
