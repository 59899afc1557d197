use serde::{Deserialize, Serialize};
use tenant_directory_sdk::TenantIdentity;

use crate::domain::registry::{NewTenant, TenantPage, TenantQuery, TenantStats, TenantUpdate};
use crate::domain::site_config::{SiteConfig, SiteConfigPatch};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDto {
    pub id: i64,
    pub domain: String,
    pub name: String,
}

impl From<TenantIdentity> for TenantDto {
    fn from(t: TenantIdentity) -> Self {
        Self {
            id: t.id.get(),
            domain: t.domain,
            name: t.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfigDto {
    pub template_key: String,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub mv_url: Option<String>,
    pub mv_type: String,
    pub description: Option<String>,
}

impl From<SiteConfig> for SiteConfigDto {
    fn from(c: SiteConfig) -> Self {
        Self {
            template_key: c.template_key,
            logo_url: c.logo_url,
            banner_url: c.banner_url,
            mv_url: c.mv_url,
            mv_type: c.mv_type,
            description: c.description,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateSiteConfigRequest {
    pub template_key: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub mv_url: Option<String>,
    pub mv_type: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateSiteConfigRequest> for SiteConfigPatch {
    fn from(r: UpdateSiteConfigRequest) -> Self {
        Self {
            template_key: r.template_key,
            logo_url: r.logo_url,
            banner_url: r.banner_url,
            mv_url: r.mv_url,
            mv_type: r.mv_type,
            description: r.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTenantRequest {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub email: String,
}

impl From<CreateTenantRequest> for NewTenant {
    fn from(r: CreateTenantRequest) -> Self {
        Self {
            name: r.name,
            domain: r.domain,
            email: r.email,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub email: Option<String>,
}

impl From<UpdateTenantRequest> for TenantUpdate {
    fn from(r: UpdateTenantRequest) -> Self {
        Self {
            name: r.name,
            domain: r.domain,
            email: r.email,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListTenantsParams {
    pub page: u64,
    pub per_page: u64,
    pub search: Option<String>,
}

impl From<ListTenantsParams> for TenantQuery {
    fn from(p: ListTenantsParams) -> Self {
        Self {
            page: p.page,
            per_page: p.per_page,
            search: p.search,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantPageDto {
    pub items: Vec<TenantDto>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

impl From<TenantPage> for TenantPageDto {
    fn from(p: TenantPage) -> Self {
        Self {
            items: p.items.into_iter().map(TenantDto::from).collect(),
            page: p.page,
            per_page: p.per_page,
            total: p.total,
            last_page: p.last_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantStatsDto {
    pub total: u64,
}

impl From<TenantStats> for TenantStatsDto {
    fn from(s: TenantStats) -> Self {
        Self { total: s.total }
    }
}
