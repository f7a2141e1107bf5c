use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::Instrument;

use crate::core::transactional::context::TransactionalContext;
use crate::core::transactional::error::TransactionalError;
use crate::core::transactional::options::TransactionOptions;

/// A method bound to a transactional context.
///
/// Every [`call`](Transactional::call) behaves like
/// [`TransactionalContext::run_in_transaction`] around the wrapped method.
/// The method's name travels with the wrapper and is recorded on the
/// `transactional` span and in `options().name`.
pub struct Transactional<F> {
    context: Arc<TransactionalContext>,
    name: String,
    options: TransactionOptions,
    method: F,
}

impl<F> Transactional<F> {
    pub fn new(
        context: Arc<TransactionalContext>,
        name: impl Into<String>,
        mut options: TransactionOptions,
        method: F,
    ) -> Self {
        let name = name.into();
        options.name = Some(name.clone());
        Self {
            context,
            name,
            options,
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionalError> + fmt::Display,
    {
        let span = tracing::debug_span!(
            "transactional",
            method = %self.name,
            data_source = %self.options.data_source_name,
            propagation = %self.options.propagation,
        );
        // the method is invoked on first poll, inside the scope the engine opens
        let method = &self.method;
        self.context
            .run_in_transaction(self.options.clone(), async move { method(args).await })
            .instrument(span)
            .await
    }
}

impl<F> fmt::Debug for Transactional<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transactional")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
