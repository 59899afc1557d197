//! Domain → tenant resolution with a coherent cache.
//!
//! The cache only ever holds positive answers read from the store. Entries
//! have no TTL; they are removed by [`TenantDirectory::invalidate`] and
//! [`TenantDirectory::notify_mutated`], which the tenant lifecycle calls from
//! after-commit hooks.
//!
//! A miss that raced with an invalidation must not repopulate the cache with
//! what it read before the commit. Every invalidation bumps `epoch`; a miss
//! remembers the epoch it started under and only inserts if nothing was
//! invalidated meanwhile. The check and the insert happen under the shard
//! lock of the key, and invalidation bumps before it removes, so either the
//! insert sees the new epoch or the removal sees the inserted entry.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tenant_directory_sdk::{TenantId, TenantIdentity, TenantKey, normalize_domain};

use crate::config::TenantDirectoryConfig;
use crate::domain::error::DomainError;
use crate::domain::repo::TenantStore;

pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    cache: DashMap<String, TenantIdentity>,
    epoch: AtomicU64,
    central: HashSet<String>,
    prewarm_on_mutation: bool,
    max_domain_length: usize,
}

impl TenantDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>, config: &TenantDirectoryConfig) -> Self {
        let central = config
            .central_domains
            .iter()
            .filter_map(|d| match normalize_domain(d, config.max_domain_length) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring invalid central domain");
                    None
                }
            })
            .collect();

        Self {
            store,
            cache: DashMap::new(),
            epoch: AtomicU64::new(0),
            central,
            prewarm_on_mutation: config.prewarm_on_mutation,
            max_domain_length: config.max_domain_length,
        }
    }

    /// Canonical form of `raw` under this directory's limits.
    ///
    /// # Errors
    /// `InvalidDomain` for empty or malformed input.
    pub fn normalize(&self, raw: &str) -> Result<String, DomainError> {
        Ok(normalize_domain(raw, self.max_domain_length)?)
    }

    /// Resolve a request domain to its tenant.
    ///
    /// # Errors
    /// - `InvalidDomain` for empty or malformed input
    /// - `NotFound` when no tenant owns the domain (never cached)
    /// - `StoreUnavailable` when the store fails; no stale fallback
    #[tracing::instrument(skip_all, fields(domain = %raw))]
    pub async fn resolve(&self, raw: &str) -> Result<TenantIdentity, DomainError> {
        let domain = self.normalize(raw)?;

        if let Some(hit) = self.cache.get(&domain) {
            tracing::trace!(tenant.id = %hit.id, "directory cache hit");
            return Ok(hit.clone());
        }

        match self.load(&domain).await? {
            Some((identity, _)) => Ok(identity),
            None => {
                tracing::debug!("no tenant for domain");
                Err(DomainError::NotFound(TenantKey::Domain(domain)))
            }
        }
    }

    /// Warm the entry for `raw` after a committed mutation.
    ///
    /// Reads the store like a miss does, under the same epoch check, so a
    /// pre-warm that lost a race against a later commit caches nothing
    /// instead of the superseded identity. No-op unless
    /// `prewarm_on_mutation` is set. Returns whether an entry was cached.
    ///
    /// # Errors
    /// `InvalidDomain` or `StoreUnavailable`.
    pub async fn prewarm(&self, raw: &str) -> Result<bool, DomainError> {
        if !self.prewarm_on_mutation {
            return Ok(false);
        }
        let domain = self.normalize(raw)?;
        let cached = matches!(self.load(&domain).await?, Some((_, true)));
        if cached {
            tracing::debug!(domain = %domain, "directory entry pre-warmed");
        }
        Ok(cached)
    }

    /// Store read plus epoch-guarded insert; the flag tells whether it was cached.
    async fn load(&self, domain: &str) -> Result<Option<(TenantIdentity, bool)>, DomainError> {
        let epoch = self.epoch.load(Ordering::Acquire);
        let found = self.store.find_by_domain(domain).await.map_err(|e| {
            tracing::warn!(error = %e, "tenant store lookup failed");
            DomainError::store(e)
        })?;
        Ok(found.map(|identity| {
            tracing::debug!(tenant.id = %identity.id, "tenant loaded from store");
            let cached = self.populate(domain.to_owned(), &identity, epoch);
            (identity, cached)
        }))
    }

    /// Tenant by id, straight from the store. Not cached.
    ///
    /// # Errors
    /// `NotFound` or `StoreUnavailable`.
    pub async fn find_by_id(&self, id: TenantId) -> Result<TenantIdentity, DomainError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(DomainError::store)?
            .ok_or_else(|| DomainError::NotFound(TenantKey::Id(id)))
    }

    fn populate(&self, domain: String, identity: &TenantIdentity, started_at: u64) -> bool {
        let entry = self.cache.entry(domain);
        if self.epoch.load(Ordering::Acquire) == started_at {
            entry.insert(identity.clone());
            true
        } else {
            tracing::debug!(tenant.id = %identity.id, "invalidated while loading, not caching");
            false
        }
    }

    /// Drop the cached entry for `raw`, if any.
    pub fn invalidate(&self, raw: &str) {
        let Ok(domain) = self.normalize(raw) else {
            return;
        };
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if self.cache.remove(&domain).is_some() {
            tracing::debug!(domain = %domain, "directory entry invalidated");
        }
    }

    /// Bring the cache in line with a committed tenant mutation.
    ///
    /// `old_domain` is the domain before the change (`None` on creation),
    /// `fresh` the committed identity (`None` on deletion). Both domains are
    /// invalidated; nothing is inserted here, because hooks of concurrent
    /// commits may run in any order. Use [`TenantDirectory::prewarm`] to
    /// repopulate from the store.
    pub fn notify_mutated(&self, old_domain: Option<&str>, fresh: Option<&TenantIdentity>) {
        if let Some(old) = old_domain
            && fresh.is_none_or(|f| !same_domain(old, &f.domain))
        {
            self.invalidate(old);
        }
        if let Some(fresh) = fresh {
            self.invalidate(&fresh.domain);
        }
    }

    /// Whether `domain` (already normalized) is an admin host.
    #[must_use]
    pub fn is_central(&self, domain: &str) -> bool {
        self.central.contains(domain)
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_cached(&self, domain: &str) -> bool {
        self.cache.contains_key(domain)
    }
}

fn same_domain(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('.').eq_ignore_ascii_case(b)
}
