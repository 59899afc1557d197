#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tenant_context::{
    DeferredError, DeferredExecutor, DeferredExecutorConfig, DeferredOutcome, DeferredTaskCarrier,
    ScopeGuard, Snapshot, TenancyError, TenantContext, TenantId,
};
use tracing_test::traced_test;

fn single_worker() -> DeferredExecutor {
    DeferredExecutor::start(&DeferredExecutorConfig {
        workers: 1,
        queue_capacity: 16,
    })
}

#[tokio::test]
async fn submit_requires_bound_caller() {
    let exec = single_worker();
    let err = exec.submit("orphan", |_| async { Ok(()) }).unwrap_err();
    assert_eq!(err, DeferredError::Context(TenancyError::NoTenantBound));
    exec.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn snapshot_binds_captured_tenant_on_reused_worker() {
    let exec = Arc::new(single_worker());
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Same single worker serves alternating tenants.
    let mut handles = Vec::new();
    for raw in [1_i64, 2, 1, 3, 2] {
        let exec = exec.clone();
        let seen = seen.clone();
        let handle = TenantContext::run(TenantId::new(raw), async move {
            exec.submit("record", move |tenant| async move {
                let filter = ScopeGuard::active_filter()?;
                seen.lock().push((raw, tenant, filter));
                Ok(())
            })
        })
        .await
        .unwrap()
        .unwrap();
        handles.push(handle);
    }
    for h in handles {
        assert_eq!(h.outcome().await, Some(DeferredOutcome::Completed));
    }

    for (captured, tenant, filter) in seen.lock().iter() {
        assert_eq!(tenant.get(), *captured);
        assert_eq!(filter.get(), *captured);
    }
    let stats = exec.stats();
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.leaked_bindings, 0);
    exec.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn failed_request_still_runs_its_deferred_task_under_its_tenant() {
    let exec = Arc::new(single_worker());
    let seen = Arc::new(Mutex::new(None));

    let request = {
        let exec = exec.clone();
        let seen = seen.clone();
        TenantContext::run(TenantId::new(7), async move {
            let handle = exec
                .submit("after-commit", move |tenant| async move {
                    *seen.lock() = Some((tenant, TenantContext::current()?));
                    Ok(())
                })
                .unwrap();
            let res: anyhow::Result<()> = Err(anyhow::anyhow!("request failed after enqueue"));
            (res, handle)
        })
    };
    let (res, handle) = request.await.unwrap();
    assert!(res.unwrap_err().to_string().contains("request failed"));
    assert!(!TenantContext::is_bound());

    assert_eq!(handle.outcome().await, Some(DeferredOutcome::Completed));
    assert_eq!(
        *seen.lock(),
        Some((TenantId::new(7), TenantId::new(7)))
    );

    // Next job on the same worker starts clean.
    let probe = exec
        .submit_with(Snapshot::new(TenantId::new(8)), "probe", |tenant| async move {
            anyhow::ensure!(tenant == TenantId::new(8));
            anyhow::ensure!(TenantContext::current()? == TenantId::new(8));
            Ok(())
        })
        .unwrap();
    assert_eq!(probe.outcome().await, Some(DeferredOutcome::Completed));
    assert_eq!(exec.stats().leaked_bindings, 0);
    exec.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn body_errors_and_panics_do_not_stop_the_worker() {
    let exec = single_worker();
    let failing = exec
        .submit_with(Snapshot::new(TenantId::new(1)), "failing", |_| async {
            Err(anyhow::anyhow!("smtp unreachable"))
        })
        .unwrap();
    let panicking = exec
        .submit_with(Snapshot::new(TenantId::new(1)), "panicking", |_| async {
            let template: Option<&str> = None;
            let _body = template.expect("template missing");
            Ok(())
        })
        .unwrap();
    let after = exec
        .submit_with(Snapshot::new(TenantId::new(2)), "after", |_| async { Ok(()) })
        .unwrap();

    assert_eq!(failing.outcome().await, Some(DeferredOutcome::Failed));
    assert_eq!(panicking.outcome().await, Some(DeferredOutcome::Failed));
    assert_eq!(after.outcome().await, Some(DeferredOutcome::Completed));

    let stats = exec.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.leaked_bindings, 0);
    exec.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
#[traced_test]
async fn carrier_logs_contained_failures() {
    let failed = DeferredTaskCarrier::run_with(Snapshot::new(TenantId::new(3)), "welcome-mail", |_| async {
        Err(anyhow::anyhow!("smtp unreachable"))
    })
    .await;
    assert_eq!(failed, DeferredOutcome::Failed);
    assert!(logs_contain("deferred task failed"));
    assert!(logs_contain("smtp unreachable"));
    assert!(logs_contain("welcome-mail"));

    let panicked = DeferredTaskCarrier::run_with(Snapshot::new(TenantId::new(3)), "render", |_| async {
        let template: Option<&str> = None;
        let _body = template.expect("template missing");
        Ok(())
    })
    .await;
    assert_eq!(panicked, DeferredOutcome::Failed);
    assert!(logs_contain("deferred task panicked"));
    assert!(!TenantContext::is_bound());
}

#[tokio::test]
async fn shutdown_drains_then_refuses() {
    let exec = single_worker();
    let slow = exec
        .submit_with(Snapshot::new(TenantId::new(1)), "slow", |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        })
        .unwrap();
    exec.shutdown(Duration::from_secs(5)).await;
    assert_eq!(slow.outcome().await, Some(DeferredOutcome::Completed));

    let err = exec
        .submit_with(Snapshot::new(TenantId::new(1)), "late", |_| async { Ok(()) })
        .unwrap_err();
    assert_eq!(err, DeferredError::Closed);
}

#[tokio::test]
async fn bounded_queue_reports_full() {
    let exec = DeferredExecutor::start(&DeferredExecutorConfig {
        workers: 1,
        queue_capacity: 1,
    });
    let gate = Arc::new(tokio::sync::Notify::new());

    let blocker = {
        let gate = gate.clone();
        exec.submit_with(Snapshot::new(TenantId::new(1)), "blocker", move |_| async move {
            gate.notified().await;
            Ok(())
        })
        .unwrap()
    };
    // Let the worker pick up the blocker so the queue slot frees.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let queued = exec
        .submit_with(Snapshot::new(TenantId::new(1)), "queued", |_| async { Ok(()) })
        .unwrap();
    let err = exec
        .submit_with(Snapshot::new(TenantId::new(1)), "overflow", |_| async { Ok(()) })
        .unwrap_err();
    assert_eq!(err, DeferredError::QueueFull);

    gate.notify_one();
    assert_eq!(blocker.outcome().await, Some(DeferredOutcome::Completed));
    assert_eq!(queued.outcome().await, Some(DeferredOutcome::Completed));
    exec.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn carrier_run_with_keeps_request_id() {
    let snap = Snapshot::new(TenantId::new(5)).with_request_id("req-42");
    let outcome = DeferredTaskCarrier::run_with(snap, "corr", |_| async {
        anyhow::ensure!(TenantContext::request_id().as_deref() == Some("req-42"));
        Ok(())
    })
    .await;
    assert_eq!(outcome, DeferredOutcome::Completed);
}
