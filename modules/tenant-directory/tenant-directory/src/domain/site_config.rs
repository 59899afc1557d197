use serde::{Deserialize, Serialize};
use tenant_context::{ScopeGuard, TenantId};
use tenant_db::TenantDb;

use crate::domain::error::DomainError;
use crate::infra::storage::entity::site_config;
use crate::infra::storage::site_config_rows;

/// Presentation settings of one tenant's public site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub tenant_id: TenantId,
    pub template_key: String,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub mv_url: Option<String>,
    pub mv_type: String,
    pub description: Option<String>,
}

impl From<site_config::Model> for SiteConfig {
    fn from(m: site_config::Model) -> Self {
        Self {
            tenant_id: TenantId::new(m.tenant_id),
            template_key: m.template_key,
            logo_url: m.logo_url,
            banner_url: m.banner_url,
            mv_url: m.mv_url,
            mv_type: m.mv_type,
            description: m.description,
        }
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfigPatch {
    pub template_key: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub mv_url: Option<String>,
    pub mv_type: Option<String>,
    pub description: Option<String>,
}

impl SiteConfigPatch {
    fn validate(&self) -> Result<(), DomainError> {
        let limits = [
            ("template_key", &self.template_key, 50),
            ("logo_url", &self.logo_url, 500),
            ("banner_url", &self.banner_url, 500),
            ("mv_url", &self.mv_url, 500),
            ("mv_type", &self.mv_type, 20),
        ];
        for (field, value, max) in limits {
            if let Some(v) = value
                && v.chars().count() > max
            {
                return Err(DomainError::validation(
                    field,
                    format!("exceeds maximum length of {max}"),
                ));
            }
        }
        if self.template_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(DomainError::validation("template_key", "must not be blank"));
        }
        Ok(())
    }

    fn apply(self, row: &mut site_config::Model) {
        if let Some(v) = self.template_key {
            row.template_key = v;
        }
        if let Some(v) = self.logo_url {
            row.logo_url = Some(v);
        }
        if let Some(v) = self.banner_url {
            row.banner_url = Some(v);
        }
        if let Some(v) = self.mv_url {
            row.mv_url = Some(v);
        }
        if let Some(v) = self.mv_type {
            row.mv_type = v;
        }
        if let Some(v) = self.description {
            row.description = Some(v);
        }
    }
}

/// Site configuration of the tenant bound to the current unit of work.
///
/// Every operation runs under [`ScopeGuard`]; without a bound tenant
/// nothing is read or written.
#[derive(Clone)]
pub struct SiteConfigService {
    db: TenantDb,
}

impl SiteConfigService {
    #[must_use]
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }

    /// Current configuration, created with defaults on first access.
    ///
    /// # Errors
    /// `Tenancy(NoTenantBound)` outside a bound unit, `StoreUnavailable` on
    /// database failures.
    #[tracing::instrument(skip_all)]
    pub async fn get(&self) -> Result<SiteConfig, DomainError> {
        ScopeGuard::with_scope_async(|tenant| async move {
            let conn = self.db.conn();
            if let Some(row) = site_config_rows::find_current(conn).await? {
                return Ok(SiteConfig::from(row));
            }
            tracing::debug!(tenant.id = %tenant, "creating default site config");
            let row = site_config_rows::insert_default(conn).await?;
            Ok::<_, DomainError>(SiteConfig::from(row))
        })
        .await
    }

    /// # Errors
    /// `Validation` for oversized fields, otherwise as [`SiteConfigService::get`].
    #[tracing::instrument(skip_all)]
    pub async fn update(&self, patch: SiteConfigPatch) -> Result<SiteConfig, DomainError> {
        patch.validate()?;
        ScopeGuard::with_scope_async(|tenant| async move {
            let conn = self.db.conn();
            let mut row = match site_config_rows::find_current(conn).await? {
                Some(row) => row,
                None => site_config_rows::insert_default(conn).await?,
            };
            patch.apply(&mut row);
            let saved = site_config_rows::save_current(conn, row).await?;
            tracing::info!(tenant.id = %tenant, "site config updated");
            Ok::<_, DomainError>(SiteConfig::from(saved))
        })
        .await
    }
}
