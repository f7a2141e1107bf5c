//! Ambient key/value storage scoped to one logical call chain.
//!
//! A scope is entered with [`StorageDriver::run_scoped`]: the new scope
//! starts with a copy of the parent's bindings, writes inside it stay inside
//! it, and the parent's bindings are untouched once the scoped future
//! completes, fails or is dropped.
//!
//! Two drivers implement the same contract:
//!
//! - [`NativeDriver`] uses tokio's task-local storage.
//! - [`ExplicitStackDriver`] keeps its own per-thread stack of layers,
//!   entered and exited around every poll.

mod explicit_stack;
mod native;

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::Either;
use serde::Deserialize;
use tokio::task::futures::TaskLocalFuture;

pub use explicit_stack::{ExplicitStackDriver, LayerScoped};
pub use native::NativeDriver;

pub type StorageValue = Arc<dyn Any + Send + Sync>;
pub type Bindings = HashMap<String, StorageValue>;

pub trait StorageDriver {
    type Scoped<F: Future>: Future<Output = F::Output>;

    /// True while running inside a scope entered through this driver.
    fn is_active(&self) -> bool;

    fn get(&self, key: &str) -> Option<StorageValue>;

    /// Binds `key` in the current scope; `None` clears it. No-op outside a scope.
    fn set(&self, key: &str, value: Option<StorageValue>);

    fn run_scoped<F: Future>(&self, fut: F) -> Self::Scoped<F>;

    fn get_typed<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key)?.downcast::<T>().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageMode {
    /// `Native` when a tokio runtime is reachable, `ExplicitStack` otherwise.
    #[default]
    Auto,
    ExplicitStack,
    Native,
}

impl StorageMode {
    /// Resolves `Auto` against the calling thread.
    pub fn resolve(self) -> StorageMode {
        match self {
            StorageMode::Auto if tokio::runtime::Handle::try_current().is_ok() => {
                StorageMode::Native
            }
            StorageMode::Auto => StorageMode::ExplicitStack,
            mode => mode,
        }
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AUTO" => Ok(StorageMode::Auto),
            "EXPLICIT_STACK" => Ok(StorageMode::ExplicitStack),
            "NATIVE" => Ok(StorageMode::Native),
            other => Err(format!("Unknown storage mode: {other}")),
        }
    }
}

/// The driver selected for a context.
#[derive(Debug, Clone, Copy)]
pub enum Storage {
    Native(NativeDriver),
    ExplicitStack(ExplicitStackDriver),
}

impl Storage {
    pub fn create(mode: StorageMode) -> Self {
        match mode.resolve() {
            StorageMode::ExplicitStack => Storage::ExplicitStack(ExplicitStackDriver),
            _ => Storage::Native(NativeDriver),
        }
    }

    pub fn mode(&self) -> StorageMode {
        match self {
            Storage::Native(_) => StorageMode::Native,
            Storage::ExplicitStack(_) => StorageMode::ExplicitStack,
        }
    }
}

impl StorageDriver for Storage {
    type Scoped<F: Future> = Either<TaskLocalFuture<RefCell<Bindings>, F>, LayerScoped<F>>;

    fn is_active(&self) -> bool {
        match self {
            Storage::Native(driver) => driver.is_active(),
            Storage::ExplicitStack(driver) => driver.is_active(),
        }
    }

    fn get(&self, key: &str) -> Option<StorageValue> {
        match self {
            Storage::Native(driver) => driver.get(key),
            Storage::ExplicitStack(driver) => driver.get(key),
        }
    }

    fn set(&self, key: &str, value: Option<StorageValue>) {
        match self {
            Storage::Native(driver) => driver.set(key, value),
            Storage::ExplicitStack(driver) => driver.set(key, value),
        }
    }

    fn run_scoped<F: Future>(&self, fut: F) -> Self::Scoped<F> {
        match self {
            Storage::Native(driver) => Either::Left(driver.run_scoped(fut)),
            Storage::ExplicitStack(driver) => Either::Right(driver.run_scoped(fut)),
        }
    }
}
