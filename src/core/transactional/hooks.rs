use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use futures::executor::ThreadPool;
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::core::transactional::error::{ConfigurationError, TransactionalError};
use crate::core::transactional::storage::{StorageDriver, StorageValue};

pub(crate) const HOOK_KEY: &str = "transactional:hook";

type CommitHook = Box<dyn FnOnce() + Send>;
type RollbackHook = Box<dyn FnOnce(&TransactionFailure) + Send>;
type CompleteHook = Box<dyn FnOnce(Option<&TransactionFailure>) + Send>;

/// Why a unit of work rolled back, as seen by hook listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFailure {
    message: Arc<str>,
}

impl TransactionFailure {
    pub fn new(error: &impl fmt::Display) -> Self {
        Self {
            message: error.to_string().into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Default)]
struct Listeners {
    commit: Vec<CommitHook>,
    rollback: Vec<RollbackHook>,
    complete: Vec<CompleteHook>,
    warned: [bool; 3],
}

/// One-shot commit/rollback/complete listeners for one hook scope.
pub struct HookEmitter {
    max_listeners: usize,
    listeners: Mutex<Listeners>,
}

impl HookEmitter {
    pub fn new(max_listeners: usize) -> Self {
        Self {
            max_listeners,
            listeners: Mutex::new(Listeners::default()),
        }
    }

    pub fn on_commit(&self, hook: impl FnOnce() + Send + 'static) {
        let mut listeners = self.listeners.lock();
        listeners.commit.push(Box::new(hook));
        let count = listeners.commit.len();
        self.check_ceiling(&mut listeners.warned[0], "commit", count);
    }

    pub fn on_rollback(&self, hook: impl FnOnce(&TransactionFailure) + Send + 'static) {
        let mut listeners = self.listeners.lock();
        listeners.rollback.push(Box::new(hook));
        let count = listeners.rollback.len();
        self.check_ceiling(&mut listeners.warned[1], "rollback", count);
    }

    pub fn on_complete(&self, hook: impl FnOnce(Option<&TransactionFailure>) + Send + 'static) {
        let mut listeners = self.listeners.lock();
        listeners.complete.push(Box::new(hook));
        let count = listeners.complete.len();
        self.check_ceiling(&mut listeners.warned[2], "complete", count);
    }

    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.lock();
        listeners.commit.len() + listeners.rollback.len() + listeners.complete.len()
    }

    fn check_ceiling(&self, warned: &mut bool, event: &'static str, count: usize) {
        if self.max_listeners == 0 || count <= self.max_listeners || *warned {
            return;
        }
        *warned = true;
        warn!(
            event,
            count,
            max = self.max_listeners,
            "possible hook listener leak detected, raise max_hook_handlers if this is intended"
        );
    }

    /// Fires `commit` then `complete(None)`, or `rollback` then
    /// `complete(Some)`, and drops every listener.
    pub fn fire(&self, outcome: Result<(), TransactionFailure>) {
        let listeners = std::mem::take(&mut *self.listeners.lock());
        match outcome {
            Ok(()) => {
                listeners.commit.into_iter().for_each(|hook| hook());
                listeners.complete.into_iter().for_each(|hook| hook(None));
            }
            Err(failure) => {
                listeners.rollback.into_iter().for_each(|hook| hook(&failure));
                listeners
                    .complete
                    .into_iter()
                    .for_each(|hook| hook(Some(&failure)));
            }
        }
    }
}

/// Single worker that fires hooks for units of work running outside tokio.
/// `None` when the worker thread could not be started.
fn hook_pool() -> Option<&'static ThreadPool> {
    static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        ThreadPool::builder()
            .pool_size(1)
            .name_prefix("transactional-hooks-")
            .create()
            .map_err(|e| error!(error = %e, "failed to start hook worker"))
            .ok()
    })
    .as_ref()
}

/// Fires the emitter on another task so listeners never run on the caller's
/// stack: a tokio task when a runtime is reachable, the hook worker otherwise.
fn schedule(emitter: Arc<HookEmitter>, outcome: Result<(), TransactionFailure>) {
    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        runtime.spawn(async move { emitter.fire(outcome) });
        return;
    }
    match hook_pool() {
        Some(pool) => pool.spawn_ok(async move {
            if panic::catch_unwind(AssertUnwindSafe(|| emitter.fire(outcome))).is_err() {
                error!("transaction hook panicked");
            }
        }),
        None => {
            warn!("no hook worker available, firing transaction hooks inline");
            emitter.fire(outcome);
        }
    }
}

/// Awaits `work` and schedules the emitter's terminal events for its outcome.
/// The outcome is returned untouched.
pub async fn run_and_fire<F, T, E>(emitter: Arc<HookEmitter>, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let result = work.await;
    let outcome = match &result {
        Ok(_) => Ok(()),
        Err(error) => Err(TransactionFailure::new(error)),
    };
    schedule(emitter, outcome);
    result
}

/// Runs `work` in a nested scope that owns a fresh emitter.
pub async fn run_in_new_hook_scope<S, F, T, E>(
    storage: &S,
    max_listeners: usize,
    work: F,
) -> Result<T, E>
where
    S: StorageDriver,
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let emitter = Arc::new(HookEmitter::new(max_listeners));
    storage
        .run_scoped(async move {
            storage.set(HOOK_KEY, Some(emitter.clone() as StorageValue));
            run_and_fire(emitter, work).await
        })
        .await
}

/// The emitter of the innermost hook scope.
pub fn current_emitter<S: StorageDriver>(storage: &S) -> Result<Arc<HookEmitter>, TransactionalError> {
    storage
        .get_typed::<HookEmitter>(HOOK_KEY)
        .ok_or_else(|| ConfigurationError::NoHookScope.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transactional::storage::NativeDriver;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<HookEmitter>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let emitter = Arc::new(HookEmitter::new(10));

        let log = events.clone();
        emitter.on_commit(move || log.lock().push("commit".to_string()));
        let log = events.clone();
        emitter.on_rollback(move |failure| log.lock().push(format!("rollback: {failure}")));
        let log = events.clone();
        emitter.on_complete(move |failure| {
            log.lock().push(format!("end: {}", failure.map(|f| f.message()).unwrap_or("-")))
        });
        (events, emitter)
    }

    #[test]
    fn commit_fires_commit_then_end_once() {
        let (events, emitter) = recorder();
        emitter.fire(Ok(()));
        emitter.fire(Ok(()));
        assert_eq!(*events.lock(), vec!["commit", "end: -"]);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn rollback_fires_rollback_then_end_with_the_failure() {
        let (events, emitter) = recorder();
        emitter.fire(Err(TransactionFailure::new(&"boom")));
        assert_eq!(*events.lock(), vec!["rollback: boom", "end: boom"]);
    }

    #[test]
    fn exceeding_the_ceiling_only_warns() {
        let emitter = HookEmitter::new(1);
        emitter.on_commit(|| {});
        emitter.on_commit(|| {});
        emitter.on_commit(|| {});
        assert_eq!(emitter.listener_count(), 3);
    }

    #[tokio::test]
    async fn hooks_fire_after_the_result_is_returned() {
        let storage = NativeDriver;
        let events = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let log = events.clone();
        let result: Result<i32, String> = run_in_new_hook_scope(&storage, 10, async {
            let emitter = current_emitter(&storage).unwrap();
            let commit_log = log.clone();
            emitter.on_commit(move || commit_log.lock().push("commit"));
            emitter.on_complete(move |_| {
                let _ = done_tx.send(());
            });
            Ok(7)
        })
        .await;

        assert_eq!(result, Ok(7));
        assert!(events.lock().is_empty());
        done_rx.await.unwrap();
        assert_eq!(*events.lock(), vec!["commit"]);
    }

    #[test]
    fn hooks_fire_off_the_caller_stack_without_tokio() {
        use crate::core::transactional::storage::ExplicitStackDriver;
        use std::sync::mpsc;
        use std::time::Duration;

        let storage = ExplicitStackDriver;
        let events = Arc::new(Mutex::new(Vec::new()));
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();
        let caller = std::thread::current().id();

        let log = events.clone();
        let result: Result<(), String> = futures::executor::block_on(run_in_new_hook_scope(
            &storage,
            10,
            async {
                current_emitter(&storage).unwrap().on_commit(move || {
                    // waits for the caller's continuation; times out if fired inline
                    let _ = gate_rx.recv_timeout(Duration::from_secs(2));
                    log.lock().push("commit");
                    let _ = done_tx.send((
                        std::thread::current().id(),
                        ExplicitStackDriver.is_active(),
                    ));
                });
                Ok(())
            },
        ));

        events.lock().push("continuation");
        gate_tx.send(()).unwrap();
        let (hook_thread, in_scope) = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(result, Ok(()));
        assert_eq!(*events.lock(), vec!["continuation", "commit"]);
        assert_ne!(hook_thread, caller);
        assert!(!in_scope);
    }

    #[tokio::test]
    async fn no_emitter_outside_a_hook_scope() {
        let err = current_emitter(&NativeDriver).err().unwrap();
        assert!(matches!(
            err,
            TransactionalError::Configuration(ConfigurationError::NoHookScope)
        ));
    }
}
