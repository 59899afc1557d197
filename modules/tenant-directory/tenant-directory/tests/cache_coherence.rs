#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::identity;
use tenant_directory::domain::error::DomainError;
use tenant_directory::domain::repo::TenantStore;
use tenant_directory::infra::memory::InMemoryTenantStore;
use tenant_directory::{
    LocalClient, TenantDirectory, TenantDirectoryClient, TenantDirectoryConfig, TenantId,
    TenantIdentity,
};
use tokio::sync::Notify;

fn setup(prewarm: bool) -> (Arc<InMemoryTenantStore>, Arc<TenantDirectory>) {
    let store = Arc::new(InMemoryTenantStore::default());
    let cfg = TenantDirectoryConfig {
        prewarm_on_mutation: prewarm,
        ..Default::default()
    };
    let directory = Arc::new(TenantDirectory::new(store.clone(), &cfg));
    (store, directory)
}

#[tokio::test]
async fn domain_change_is_visible_after_commit_notification() {
    for prewarm in [true, false] {
        let (store, dir) = setup(prewarm);
        store.put(identity(1, "a.example"));
        store.put(identity(2, "b.example"));

        assert_eq!(dir.resolve("a.example").await.unwrap().id, TenantId::new(1));
        assert_eq!(dir.resolve("b.example").await.unwrap().id, TenantId::new(2));

        // Committed write, then the after-commit notification.
        let renamed = identity(1, "a2.example");
        store.put(renamed.clone());
        dir.notify_mutated(Some("a.example"), Some(&renamed));

        assert!(matches!(
            dir.resolve("a.example").await,
            Err(DomainError::NotFound(_))
        ));
        assert_eq!(dir.resolve("a2.example").await.unwrap(), renamed);
        assert_eq!(dir.resolve("b.example").await.unwrap().id, TenantId::new(2));
        assert!(dir.is_cached("a2.example"));
    }
}

#[tokio::test]
async fn hooks_running_out_of_commit_order_do_not_cache_superseded_domain() {
    let (store, dir) = setup(true);
    store.put(identity(1, "a.example"));
    assert_eq!(dir.resolve("a.example").await.unwrap().id, TenantId::new(1));

    // a -> a2 commits, then a2 -> a3 commits; the hooks run the other way round.
    let a2 = identity(1, "a2.example");
    let a3 = identity(1, "a3.example");
    store.put(a3.clone());
    dir.notify_mutated(Some("a2.example"), Some(&a3));
    dir.prewarm(&a3.domain).await.unwrap();
    dir.notify_mutated(Some("a.example"), Some(&a2));
    dir.prewarm(&a2.domain).await.unwrap();

    assert!(!dir.is_cached("a2.example"));
    assert!(matches!(dir.resolve("a2.example").await, Err(DomainError::NotFound(_))));
    assert!(matches!(dir.resolve("a.example").await, Err(DomainError::NotFound(_))));
    assert_eq!(dir.resolve("a3.example").await.unwrap(), a3);
}

#[tokio::test]
async fn unknown_domain_is_not_negatively_cached() {
    let (store, dir) = setup(false);

    assert!(matches!(dir.resolve("new.example").await, Err(DomainError::NotFound(_))));
    assert_eq!(dir.cached_len(), 0);

    store.put(identity(9, "new.example"));
    // Even without a notification the next lookup goes to the store.
    assert_eq!(dir.resolve("new.example").await.unwrap().id, TenantId::new(9));
    assert_eq!(store.domain_lookups(), 2);
}

#[tokio::test]
async fn deletion_removes_entry() {
    let (store, dir) = setup(true);
    store.put(identity(3, "c.example"));
    dir.resolve("c.example").await.unwrap();

    let removed = store.remove(TenantId::new(3)).unwrap();
    dir.notify_mutated(Some(&removed.domain), None);

    assert!(!dir.is_cached("c.example"));
    assert!(matches!(dir.resolve("c.example").await, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn store_failure_is_not_masked_by_stale_entry() {
    let (store, dir) = setup(false);
    store.put(identity(4, "d.example"));
    dir.resolve("d.example").await.unwrap();

    dir.invalidate("d.example");
    store.set_unavailable(true);
    assert!(matches!(
        dir.resolve("d.example").await,
        Err(DomainError::StoreUnavailable(_))
    ));
    assert_eq!(dir.cached_len(), 0);

    store.set_unavailable(false);
    assert_eq!(dir.resolve("d.example").await.unwrap().id, TenantId::new(4));
}

#[tokio::test]
async fn invalidate_is_noop_for_absent_or_malformed() {
    let (_store, dir) = setup(true);
    dir.invalidate("never-seen.example");
    dir.invalidate("");
    assert_eq!(dir.cached_len(), 0);
}

#[tokio::test]
async fn sdk_client_maps_errors() {
    let (store, dir) = setup(true);
    store.put(identity(5, "e.example"));
    let client: Arc<dyn TenantDirectoryClient> = Arc::new(LocalClient::new(dir.clone()));

    assert_eq!(client.resolve("E.example").await.unwrap().id, TenantId::new(5));
    assert!(matches!(
        client.resolve("x.example").await,
        Err(tenant_directory::DirectoryError::TenantNotFound { .. })
    ));
    assert!(matches!(
        client.resolve("bad host").await,
        Err(tenant_directory::DirectoryError::InvalidDomain { .. })
    ));

    client.invalidate("e.example");
    assert!(!dir.is_cached("e.example"));
}

/// Store that answers from a fixed snapshot and blocks until released, to
/// model a read that started before a commit and finishes after it.
struct SlowStore {
    answer: TenantIdentity,
    entered: Notify,
    release: Notify,
    blocking: AtomicBool,
}

#[async_trait]
impl TenantStore for SlowStore {
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<TenantIdentity>> {
        if self.blocking.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
            return Ok(Some(self.answer.clone()));
        }
        Ok((domain == "a2.example").then(|| identity(1, "a2.example")))
    }

    async fn find_by_id(&self, _id: TenantId) -> anyhow::Result<Option<TenantIdentity>> {
        Ok(None)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_racing_with_commit_does_not_resurrect_old_domain() {
    let store = Arc::new(SlowStore {
        answer: identity(1, "a.example"),
        entered: Notify::new(),
        release: Notify::new(),
        blocking: AtomicBool::new(true),
    });
    let cfg = TenantDirectoryConfig {
        prewarm_on_mutation: false,
        ..Default::default()
    };
    let dir = Arc::new(TenantDirectory::new(store.clone(), &cfg));

    let reader = {
        let dir = dir.clone();
        tokio::spawn(async move { dir.resolve("a.example").await })
    };
    store.entered.notified().await;

    // Rename commits while the read is in flight.
    let renamed = identity(1, "a2.example");
    dir.notify_mutated(Some("a.example"), Some(&renamed));
    store.release.notify_one();

    // The in-flight read returns what it saw, but must not cache it.
    let seen = reader.await.unwrap().unwrap();
    assert_eq!(seen.domain, "a.example");
    assert!(!dir.is_cached("a.example"));
    assert!(matches!(dir.resolve("a.example").await, Err(DomainError::NotFound(_))));
    assert_eq!(dir.resolve("a2.example").await.unwrap(), renamed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_never_cross_tenants() {
    let (store, dir) = setup(true);
    for i in 1..=8 {
        store.put(identity(i, &format!("t{i}.example")));
    }

    let mut tasks = Vec::new();
    for round in 0..64_i64 {
        let dir = dir.clone();
        tasks.push(tokio::spawn(async move {
            let i = round % 8 + 1;
            let t = dir.resolve(&format!("t{i}.example")).await.unwrap();
            assert_eq!(t.id, TenantId::new(i));
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(dir.cached_len(), 8);
}
