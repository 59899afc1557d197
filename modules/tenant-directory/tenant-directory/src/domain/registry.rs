//! Tenant lifecycle: create, update, delete, plus the central listing.
//!
//! Each mutation runs in one transaction. Cache invalidation and the welcome
//! mail are registered as after-commit hooks, so a rolled back write never
//! touches the directory cache and never mails anybody. Pre-warming happens
//! once the commit returned, by reading the store back.
//!
//! Rows of the new or removed tenant (its site configuration) are written
//! through the tenant-scoped layer by opening a unit of work for that tenant
//! inside the transaction. Callers must therefore not be bound to a tenant
//! themselves: the lifecycle is driven from central (admin) requests.

use std::sync::Arc;

use sea_orm::{DbErr, SqlErr};
use tenant_context::{DeferredExecutor, ScopeGuard, Snapshot, TenantContext};
use tenant_db::TenantDb;
use tenant_directory_sdk::{TenantId, TenantIdentity, TenantKey};

use crate::domain::error::DomainError;
use crate::domain::notifier::WelcomeNotifier;
use crate::domain::service::TenantDirectory;
use crate::infra::storage::{site_config_rows, tenant_rows};

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub domain: String,
    pub email: String,
}

/// Fields to change. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub email: Option<String>,
}

/// Default page size of [`TenantRegistry::list`].
pub const DEFAULT_PER_PAGE: u64 = 20;
/// Largest page size [`TenantRegistry::list`] serves.
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct TenantQuery {
    /// 1-based; 0 is read as 1.
    pub page: u64,
    /// 0 selects [`DEFAULT_PER_PAGE`]; clamped to [`MAX_PER_PAGE`].
    pub per_page: u64,
    /// Matched against name and domain, ignoring case. Blank means no filter.
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TenantPage {
    pub items: Vec<TenantIdentity>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantStats {
    pub total: u64,
}

pub struct TenantRegistry {
    db: TenantDb,
    directory: Arc<TenantDirectory>,
    executor: Arc<DeferredExecutor>,
    notifier: Arc<WelcomeNotifier>,
}

impl TenantRegistry {
    #[must_use]
    pub fn new(
        db: TenantDb,
        directory: Arc<TenantDirectory>,
        executor: Arc<DeferredExecutor>,
        notifier: Arc<WelcomeNotifier>,
    ) -> Self {
        Self {
            db,
            directory,
            executor,
            notifier,
        }
    }

    /// Register a tenant together with its default site configuration.
    ///
    /// # Errors
    /// - `Validation` for a blank name
    /// - `InvalidDomain`, `DomainTaken`
    /// - `Tenancy(RebindConflict)` when called from a tenant-bound unit
    /// - `StoreUnavailable` on database failures
    #[tracing::instrument(skip_all, fields(domain = %new.domain))]
    pub async fn create(&self, new: NewTenant) -> Result<TenantIdentity, DomainError> {
        let name = required("name", &new.name)?;
        let domain = self.directory.normalize(&new.domain)?;
        let email = new.email.trim().to_owned();

        let directory = self.directory.clone();
        let executor = self.executor.clone();
        let notifier = self.notifier.clone();
        let request_id = TenantContext::request_id();

        let created = self
            .db
            .in_transaction(move |txn, after| {
                Box::pin(async move {
                    if tenant_rows::find_by_domain(txn, &domain).await?.is_some() {
                        return Err(DomainError::DomainTaken(domain));
                    }
                    let row = tenant_rows::insert(txn, name, domain.clone(), email)
                        .await
                        .map_err(|e| write_error(e, &domain))?;
                    let identity = TenantIdentity::from(row);

                    let seeded = TenantContext::run(
                        identity.id,
                        ScopeGuard::with_scope_async(|_| site_config_rows::insert_default(txn)),
                    )
                    .await??;
                    tracing::debug!(tenant.id = %identity.id, site_config.id = seeded.id, "default site config created");

                    let fresh = identity.clone();
                    after.register("directory.notify_mutated", move || {
                        directory.notify_mutated(None, Some(&fresh));
                    });
                    let welcome = identity.clone();
                    after.register("tenant.welcome", move || {
                        enqueue_welcome(&executor, notifier, welcome, request_id);
                    });
                    Ok(identity)
                })
            })
            .await
            .map_err(|e| e.into_domain(DomainError::from))?;

        tracing::info!(tenant.id = %created.id, "tenant created");
        self.prewarm(&created.domain).await;
        Ok(created)
    }

    /// Change name, domain or email of an existing tenant.
    ///
    /// # Errors
    /// - `NotFound` for an unknown id
    /// - `Validation`, `InvalidDomain`, `DomainTaken`
    /// - `StoreUnavailable` on database failures
    #[tracing::instrument(skip_all, fields(tenant.id = %id))]
    pub async fn update(
        &self,
        id: TenantId,
        update: TenantUpdate,
    ) -> Result<TenantIdentity, DomainError> {
        let name = update
            .name
            .as_deref()
            .map(|n| required("name", n))
            .transpose()?;
        let domain = update
            .domain
            .as_deref()
            .map(|d| self.directory.normalize(d))
            .transpose()?;
        let email = update.email.map(|e| e.trim().to_owned());
        let directory = self.directory.clone();

        let updated = self
            .db
            .in_transaction(move |txn, after| {
                Box::pin(async move {
                    let Some(mut row) = tenant_rows::find_by_id(txn, id).await? else {
                        return Err(DomainError::NotFound(TenantKey::Id(id)));
                    };
                    let old_domain = row.domain.clone();

                    if let Some(domain) = domain
                        && domain != row.domain
                    {
                        if tenant_rows::find_by_domain(txn, &domain).await?.is_some() {
                            return Err(DomainError::DomainTaken(domain));
                        }
                        row.domain = domain;
                    }
                    if let Some(name) = name {
                        row.name = name;
                    }
                    if let Some(email) = email {
                        row.email = email;
                    }

                    let new_domain = row.domain.clone();
                    let identity = TenantIdentity::from(
                        tenant_rows::save(txn, row)
                            .await
                            .map_err(|e| write_error(e, &new_domain))?,
                    );

                    let fresh = identity.clone();
                    after.register("directory.notify_mutated", move || {
                        directory.notify_mutated(Some(&old_domain), Some(&fresh));
                    });
                    Ok(identity)
                })
            })
            .await
            .map_err(|e| e.into_domain(DomainError::from))?;

        tracing::info!(domain = %updated.domain, "tenant updated");
        self.prewarm(&updated.domain).await;
        Ok(updated)
    }

    /// Remove a tenant and its tenant-scoped rows.
    ///
    /// # Errors
    /// - `NotFound` for an unknown id
    /// - `Tenancy(RebindConflict)` when called from a tenant-bound unit
    /// - `StoreUnavailable` on database failures
    #[tracing::instrument(skip_all, fields(tenant.id = %id))]
    pub async fn delete(&self, id: TenantId) -> Result<TenantIdentity, DomainError> {
        let directory = self.directory.clone();

        let removed = self
            .db
            .in_transaction(move |txn, after| {
                Box::pin(async move {
                    let Some(row) = tenant_rows::find_by_id(txn, id).await? else {
                        return Err(DomainError::NotFound(TenantKey::Id(id)));
                    };

                    let configs = TenantContext::run(
                        id,
                        ScopeGuard::with_scope_async(|_| site_config_rows::delete_current(txn)),
                    )
                    .await??;
                    tenant_rows::delete(txn, id).await?;
                    tracing::debug!(site_configs = configs, "tenant rows removed");

                    let identity = TenantIdentity::from(row);
                    let old_domain = identity.domain.clone();
                    after.register("directory.notify_mutated", move || {
                        directory.notify_mutated(Some(&old_domain), None);
                    });
                    Ok(identity)
                })
            })
            .await
            .map_err(|e| e.into_domain(DomainError::from))?;

        tracing::info!(domain = %removed.domain, "tenant deleted");
        Ok(removed)
    }

    /// # Errors
    /// `NotFound` or `StoreUnavailable`.
    pub async fn get(&self, id: TenantId) -> Result<TenantIdentity, DomainError> {
        self.directory.find_by_id(id).await
    }

    /// # Errors
    /// `StoreUnavailable`.
    pub async fn list(&self, query: TenantQuery) -> Result<TenantPage, DomainError> {
        let page = query.page.max(1);
        let per_page = match query.per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (rows, totals) = tenant_rows::page(self.db.conn(), search, page, per_page).await?;
        Ok(TenantPage {
            items: rows.into_iter().map(TenantIdentity::from).collect(),
            page,
            per_page,
            total: totals.number_of_items,
            last_page: totals.number_of_pages.max(1),
        })
    }

    /// # Errors
    /// `StoreUnavailable`.
    pub async fn stats(&self) -> Result<TenantStats, DomainError> {
        let total = tenant_rows::count(self.db.conn()).await?;
        Ok(TenantStats { total })
    }

    /// Failing to warm only costs the next request a store read.
    async fn prewarm(&self, domain: &str) {
        if let Err(e) = self.directory.prewarm(domain).await {
            tracing::warn!(domain = %domain, error = %e, "directory pre-warm failed");
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(field, "must not be blank"));
    }
    Ok(value.to_owned())
}

fn write_error(e: DbErr, domain: &str) -> DomainError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        DomainError::DomainTaken(domain.to_owned())
    } else {
        e.into()
    }
}

fn enqueue_welcome(
    executor: &DeferredExecutor,
    notifier: Arc<WelcomeNotifier>,
    tenant: TenantIdentity,
    request_id: Option<Arc<str>>,
) {
    let tenant_id = tenant.id;
    let mut snapshot = Snapshot::new(tenant_id);
    if let Some(rid) = request_id {
        snapshot = snapshot.with_request_id(rid);
    }

    let submitted = executor.submit_with(snapshot, "tenant-welcome", move |bound| async move {
        anyhow::ensure!(
            bound == tenant.id,
            "welcome task bound to tenant {bound}, expected {}",
            tenant.id
        );
        notifier.send_welcome(&tenant).await?;
        Ok(())
    });
    if let Err(e) = submitted {
        tracing::error!(tenant.id = %tenant_id, error = %e, "could not enqueue registration mail");
    }
}
