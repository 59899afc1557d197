#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tenant_context::{ScopeGuard, TenancyError, TenantContext, TenantId};

fn t(raw: i64) -> TenantId {
    TenantId::new(raw)
}

#[tokio::test]
async fn scope_without_binding_never_runs_work() {
    let mut ran = false;
    let res: Result<(), TenancyError> = ScopeGuard::with_scope_async(|_| {
        ran = true;
        async { Ok(()) }
    })
    .await;
    assert_eq!(res, Err(TenancyError::NoTenantBound));
    assert!(!ran);

    // Same inside an unbound unit.
    TenantContext::unit(async {
        let res: Result<(), TenancyError> = ScopeGuard::with_scope(|_| Ok(()));
        assert_eq!(res, Err(TenancyError::NoTenantBound));
    })
    .await;
}

#[tokio::test]
async fn no_binding_survives_success() {
    let out = TenantContext::run(t(1), async { TenantContext::current() })
        .await
        .unwrap();
    assert_eq!(out.unwrap(), t(1));
    assert_eq!(TenantContext::current(), Err(TenancyError::NoTenantBound));
}

#[tokio::test]
async fn no_binding_survives_error() {
    let out: Result<(), anyhow::Error> = TenantContext::run(t(2), async {
        ScopeGuard::with_scope_async(|_| async { anyhow::bail!("write failed") }).await
    })
    .await
    .unwrap();
    assert!(out.is_err());
    assert_eq!(TenantContext::current(), Err(TenancyError::NoTenantBound));
    assert_eq!(ScopeGuard::active_filter(), Err(TenancyError::NoTenantBound));
}

#[tokio::test]
async fn no_binding_survives_panic() {
    let unit = TenantContext::run(t(3), async {
        let _token = ScopeGuard::activate().unwrap();
        panic!("handler exploded");
    });
    let caught = AssertUnwindSafe(unit).catch_unwind().await;
    assert!(caught.is_err());
    assert_eq!(TenantContext::current(), Err(TenancyError::NoTenantBound));
}

#[tokio::test]
async fn no_binding_survives_cancellation() {
    let unit = TenantContext::run(t(4), async {
        let _token = ScopeGuard::activate().unwrap();
        futures::future::pending::<()>().await;
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(10), unit).await;
    assert!(timed_out.is_err());
    assert_eq!(TenantContext::current(), Err(TenancyError::NoTenantBound));
}

#[tokio::test]
async fn aborted_task_leaves_no_trace() {
    let handle = tokio::spawn(TenantContext::run(t(5), async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }));
    tokio::task::yield_now().await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    let seen = tokio::spawn(async { TenantContext::try_current() }).await.unwrap();
    assert_eq!(seen, None);
}

#[tokio::test]
async fn spawned_tasks_do_not_inherit_binding() {
    TenantContext::run(t(6), async {
        let child = tokio::spawn(async { TenantContext::current() }).await.unwrap();
        assert_eq!(child, Err(TenancyError::NoTenantBound));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn nested_unit_while_bound_is_a_conflict() {
    let outer = TenantContext::run(t(1), async {
        TenantContext::run(t(2), async { 0_u8 }).await
    })
    .await
    .unwrap();
    assert_eq!(
        outer.unwrap_err(),
        TenancyError::RebindConflict {
            bound: t(1),
            requested: t(2)
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_units_see_only_their_own_tenant() {
    let tasks: Vec<_> = (1..=64)
        .map(|raw| {
            tokio::spawn(TenantContext::run(t(raw), async move {
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                    let seen: Result<TenantId, TenancyError> =
                        ScopeGuard::with_scope(|_| ScopeGuard::active_filter());
                    assert_eq!(seen.unwrap(), t(raw));
                }
            }))
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn clear_drops_active_filter() {
    TenantContext::run(t(9), async {
        let token = ScopeGuard::activate().unwrap();
        TenantContext::clear();
        assert_eq!(ScopeGuard::active_filter(), Err(TenancyError::NoTenantBound));
        drop(token);
        TenantContext::bind(t(10)).unwrap();
        assert_eq!(ScopeGuard::active_filter(), Err(TenancyError::FilterInactive));
    })
    .await
    .unwrap();
}
