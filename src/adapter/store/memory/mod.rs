//! In-process engine that records statements instead of running them.
//!
//! Statements executed inside a transaction become visible in
//! [`MemoryDataSource::committed`] only once that transaction commits;
//! statements executed outside one are recorded immediately.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::domain::data_source::DataSource;
use crate::core::domain::transaction::{
    IsolationLevel, ToSql, TransactionError, TransactionWrapper,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub query: String,
    pub params: Vec<String>,
}

impl Statement {
    fn new(query: &str, params: Vec<Box<dyn ToSql>>) -> Self {
        Self {
            query: query.to_string(),
            params: params.iter().map(|param| render(param.as_ref())).collect(),
        }
    }
}

fn render(param: &dyn ToSql) -> String {
    if let Some(value) = param.as_i32() {
        value.to_string()
    } else if let Some(value) = param.as_i64() {
        value.to_string()
    } else if let Some(value) = param.as_string() {
        value
    } else {
        format!("{param:?}")
    }
}

#[derive(Debug, Default)]
struct State {
    committed: Vec<Statement>,
    begun: Vec<Option<IsolationLevel>>,
    commits: usize,
    rollbacks: usize,
}

#[derive(Debug, Default)]
pub struct MemoryDataSource {
    state: Arc<Mutex<State>>,
    fail_commits: bool,
    fail_rollbacks: bool,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every commit on this engine fails; the transaction is discarded.
    pub fn with_failing_commits() -> Self {
        Self {
            fail_commits: true,
            ..Self::default()
        }
    }

    /// Every rollback on this engine fails. Pending statements are still
    /// discarded and the rollback is not counted.
    pub fn with_failing_rollbacks() -> Self {
        Self {
            fail_rollbacks: true,
            ..Self::default()
        }
    }

    pub fn committed(&self) -> Vec<Statement> {
        self.state.lock().committed.clone()
    }

    pub fn committed_queries(&self) -> Vec<String> {
        self.state
            .lock()
            .committed
            .iter()
            .map(|statement| statement.query.clone())
            .collect()
    }

    /// Isolation levels requested by each `begin`, in order.
    pub fn begun(&self) -> Vec<Option<IsolationLevel>> {
        self.state.lock().begun.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn begin(
        &self,
        isolation_level: Option<IsolationLevel>,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError> {
        self.state.lock().begun.push(isolation_level);
        Ok(Box::new(MemoryTransaction {
            state: self.state.clone(),
            pending: Vec::new(),
            fail_commit: self.fail_commits,
            fail_rollback: self.fail_rollbacks,
        }))
    }

    async fn execute(
        &self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError> {
        self.state.lock().committed.push(Statement::new(query, params));
        Ok(1)
    }
}

pub struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    pending: Vec<Statement>,
    fail_commit: bool,
    fail_rollback: bool,
}

#[async_trait]
impl TransactionWrapper for MemoryTransaction {
    async fn execute(
        &mut self,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<u64, TransactionError> {
        self.pending.push(Statement::new(query, params));
        Ok(1)
    }

    async fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        if self.fail_rollback {
            return Err(TransactionError::RollbackError(
                "memory engine configured to fail rollbacks".to_string(),
            ));
        }
        self.state.lock().rollbacks += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        let mut state = self.state.lock();
        if self.fail_commit {
            state.rollbacks += 1;
            return Err(TransactionError::CommitError(
                "memory engine configured to fail commits".to_string(),
            ));
        }
        state.commits += 1;
        state.committed.extend(self.pending);
        Ok(())
    }
}
