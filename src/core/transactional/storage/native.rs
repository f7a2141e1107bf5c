use std::cell::RefCell;
use std::future::Future;

use tokio::task::futures::TaskLocalFuture;

use super::{Bindings, StorageDriver, StorageValue};

tokio::task_local! {
    static BINDINGS: RefCell<Bindings>;
}

/// Context store backed by tokio task-local storage. Each scope owns a
/// shallow copy of its parent's bindings, swapped in whenever the scoped
/// future is polled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDriver;

impl StorageDriver for NativeDriver {
    type Scoped<F: Future> = TaskLocalFuture<RefCell<Bindings>, F>;

    fn is_active(&self) -> bool {
        BINDINGS.try_with(|_| ()).is_ok()
    }

    fn get(&self, key: &str) -> Option<StorageValue> {
        BINDINGS
            .try_with(|bindings| bindings.borrow().get(key).cloned())
            .ok()
            .flatten()
    }

    fn set(&self, key: &str, value: Option<StorageValue>) {
        let _ = BINDINGS.try_with(|bindings| {
            let mut bindings = bindings.borrow_mut();
            match value {
                Some(value) => bindings.insert(key.to_string(), value),
                None => bindings.remove(key),
            };
        });
    }

    fn run_scoped<F: Future>(&self, fut: F) -> Self::Scoped<F> {
        let snapshot = BINDINGS
            .try_with(|bindings| bindings.borrow().clone())
            .unwrap_or_default();
        BINDINGS.scope(RefCell::new(snapshot), fut)
    }
}
