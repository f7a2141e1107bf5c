mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use ambient_unit_of_work::adapter::store::memory::MemoryDataSource;
use ambient_unit_of_work::{
    ConfigurationError, Propagation, StorageMode, TransactionOptions, TransactionalError,
};
use common::{fixture, fixture_with, HookProbe, TestError, STORAGE_MODES};

#[tokio::test]
async fn commit_then_end_on_success() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let probe = fx
            .context
            .run_in_transaction(TransactionOptions::default(), async {
                Ok::<_, TestError>(HookProbe::attach(&fx.context)?)
            })
            .await
            .unwrap();

        assert_eq!(probe.finish().await, vec!["commit", "end"]);
    }
}

#[tokio::test]
async fn rollback_then_end_on_failure() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let mut probe = None;
        let result = fx
            .context
            .run_in_transaction(TransactionOptions::default(), async {
                probe = Some(HookProbe::attach(&fx.context)?);
                Err::<(), _>(TestError::Work("boom".to_string()))
            })
            .await;

        assert!(result.is_err());
        let events = probe.unwrap().finish().await;
        assert_eq!(
            events,
            vec![
                "rollback: unit of work failed: boom",
                "end: unit of work failed: boom"
            ]
        );
    }
}

#[tokio::test]
async fn hooks_work_without_a_transaction() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let probe = fx
            .context
            .run_in_transaction(TransactionOptions::with_propagation(Propagation::Supports), async {
                assert_eq!(fx.current_id(), None);
                Ok::<_, TestError>(HookProbe::attach(&fx.context)?)
            })
            .await
            .unwrap();

        assert_eq!(probe.finish().await, vec!["commit", "end"]);
        assert!(fx.engine.begun().is_empty());
    }
}

#[tokio::test]
async fn registering_outside_a_scope_is_a_configuration_error() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let err = fx.context.on_commit(|| {}).err().unwrap();
        assert!(matches!(
            err,
            TransactionalError::Configuration(ConfigurationError::NoHookScope)
        ));
        assert!(fx.context.on_rollback(|_| {}).is_err());
        assert!(fx.context.on_complete(|_| {}).is_err());
    }
}

#[tokio::test]
async fn joined_work_fires_with_the_outer_transaction() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let mut inner_probe = None;
        let result = fx
            .context
            .run_in_transaction(TransactionOptions::default(), async {
                inner_probe = Some(
                    fx.context
                        .run_in_transaction(
                            TransactionOptions::with_propagation(Propagation::Required),
                            async { Ok::<_, TestError>(HookProbe::attach(&fx.context)?) },
                        )
                        .await?,
                );
                Err::<(), _>(TestError::Work("outer failed".to_string()))
            })
            .await;

        assert!(result.is_err());
        // the joined listener saw the outer outcome, not its own success
        let events = inner_probe.unwrap().finish().await;
        assert_eq!(
            events,
            vec![
                "rollback: unit of work failed: outer failed",
                "end: unit of work failed: outer failed"
            ]
        );
    }
}

#[tokio::test]
async fn requires_new_owns_its_hooks() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let mut probes = None;
        let result = fx
            .context
            .run_in_transaction(TransactionOptions::default(), async {
                let outer = HookProbe::attach(&fx.context)?;
                let inner = fx
                    .context
                    .run_in_transaction(
                        TransactionOptions::with_propagation(Propagation::RequiresNew),
                        async { Ok::<_, TestError>(HookProbe::attach(&fx.context)?) },
                    )
                    .await?;
                probes = Some((outer, inner));
                Err::<(), _>(TestError::Work("outer failed".to_string()))
            })
            .await;

        assert!(result.is_err());
        let (outer, inner) = probes.unwrap();
        assert_eq!(inner.finish().await, vec!["commit", "end"]);
        assert_eq!(
            outer.finish().await,
            vec![
                "rollback: unit of work failed: outer failed",
                "end: unit of work failed: outer failed"
            ]
        );
    }
}

#[tokio::test]
async fn not_supported_gets_a_fresh_hook_scope() {
    for mode in STORAGE_MODES {
        let fx = fixture(mode);
        let mut suspended = None;
        fx.context
            .run_in_transaction(TransactionOptions::default(), async {
                suspended = Some(
                    fx.context
                        .run_in_transaction(
                            TransactionOptions::with_propagation(Propagation::NotSupported),
                            async {
                                assert_eq!(fx.current_id(), None);
                                Ok::<_, TestError>(HookProbe::attach(&fx.context)?)
                            },
                        )
                        .await?,
                );
                Ok::<_, TestError>(())
            })
            .await
            .unwrap();

        assert_eq!(suspended.unwrap().finish().await, vec!["commit", "end"]);
    }
}

#[tokio::test]
async fn failed_rollback_still_reports_the_work_error_to_hooks() {
    for mode in STORAGE_MODES {
        let fx = fixture_with(mode, MemoryDataSource::with_failing_rollbacks());
        let mut probe = None;
        let result = fx
            .context
            .run_in_transaction(TransactionOptions::default(), async {
                probe = Some(HookProbe::attach(&fx.context)?);
                Err::<(), _>(TestError::Work("boom".to_string()))
            })
            .await;

        assert!(matches!(result, Err(TestError::Work(_))));
        assert_eq!(
            probe.unwrap().finish().await,
            vec![
                "rollback: unit of work failed: boom",
                "end: unit of work failed: boom"
            ]
        );
    }
}

#[test]
fn hooks_run_after_the_caller_resumes_without_tokio() {
    let fx = fixture(StorageMode::ExplicitStack);
    let committed = Arc::new(AtomicBool::new(false));
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let flag = committed.clone();
    let result = futures::executor::block_on(fx.context.run_in_transaction(
        TransactionOptions::default(),
        async {
            fx.context.on_commit(move || {
                let _ = gate_rx.recv_timeout(Duration::from_secs(2));
                flag.store(true, Ordering::SeqCst);
                let _ = done_tx.send(());
            })?;
            Ok::<_, TestError>(())
        },
    ));

    assert!(result.is_ok());
    assert!(!committed.load(Ordering::SeqCst), "commit hook ran before the caller resumed");
    gate_tx.send(()).unwrap();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(committed.load(Ordering::SeqCst));
}
