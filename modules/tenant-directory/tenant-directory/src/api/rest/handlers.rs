use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::{Value, json};
use tenant_context::{TenantContext, TenantId};
use tenant_directory_sdk::TenantIdentity;

use super::dto::{
    CreateTenantRequest, ListTenantsParams, SiteConfigDto, TenantDto, TenantPageDto,
    TenantStatsDto, UpdateSiteConfigRequest, UpdateTenantRequest,
};
use super::error::ApiResult;
use super::middleware::Admission;
use super::problem::Problem;
use crate::domain::error::DomainError;
use crate::domain::registry::TenantRegistry;
use crate::domain::site_config::SiteConfigService;

#[allow(clippy::unused_async)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Identity of the tenant the request was admitted for.
#[allow(clippy::unused_async)]
pub async fn current_tenant(
    tenant: Option<Extension<TenantIdentity>>,
) -> ApiResult<Json<TenantDto>> {
    let bound = TenantContext::current().map_err(DomainError::from)?;
    match tenant {
        Some(Extension(t)) if t.id == bound => Ok(Json(t.into())),
        _ => Err(DomainError::Internal(format!(
            "admitted tenant does not match bound tenant {bound}"
        ))
        .into()),
    }
}

pub async fn get_site_config(
    Extension(svc): Extension<Arc<SiteConfigService>>,
) -> ApiResult<Json<SiteConfigDto>> {
    let config = svc.get().await?;
    Ok(Json(config.into()))
}

pub async fn update_site_config(
    Extension(svc): Extension<Arc<SiteConfigService>>,
    Json(req): Json<UpdateSiteConfigRequest>,
) -> ApiResult<Json<SiteConfigDto>> {
    let config = svc.update(req.into()).await?;
    Ok(Json(config.into()))
}

pub async fn list_tenants(
    admission: Option<Extension<Admission>>,
    Extension(registry): Extension<Arc<TenantRegistry>>,
    Query(params): Query<ListTenantsParams>,
) -> ApiResult<Json<TenantPageDto>> {
    require_central(admission)?;
    let page = registry.list(params.into()).await?;
    Ok(Json(page.into()))
}

pub async fn get_tenant(
    admission: Option<Extension<Admission>>,
    Extension(registry): Extension<Arc<TenantRegistry>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TenantDto>> {
    require_central(admission)?;
    let tenant = registry.get(TenantId::new(id)).await?;
    Ok(Json(tenant.into()))
}

pub async fn tenant_stats(
    admission: Option<Extension<Admission>>,
    Extension(registry): Extension<Arc<TenantRegistry>>,
) -> ApiResult<Json<TenantStatsDto>> {
    require_central(admission)?;
    let stats = registry.stats().await?;
    Ok(Json(stats.into()))
}

pub async fn create_tenant(
    admission: Option<Extension<Admission>>,
    Extension(registry): Extension<Arc<TenantRegistry>>,
    Json(req): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<TenantDto>)> {
    require_central(admission)?;
    let tenant = registry.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(tenant.into())))
}

pub async fn update_tenant(
    admission: Option<Extension<Admission>>,
    Extension(registry): Extension<Arc<TenantRegistry>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTenantRequest>,
) -> ApiResult<Json<TenantDto>> {
    require_central(admission)?;
    let tenant = registry.update(TenantId::new(id), req.into()).await?;
    Ok(Json(tenant.into()))
}

pub async fn delete_tenant(
    admission: Option<Extension<Admission>>,
    Extension(registry): Extension<Arc<TenantRegistry>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_central(admission)?;
    registry.delete(TenantId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tenant administration is only served on central hosts; elsewhere it does
/// not exist.
#[allow(clippy::needless_pass_by_value)]
fn require_central(admission: Option<Extension<Admission>>) -> ApiResult<()> {
    match admission {
        Some(Extension(Admission::Central)) => Ok(()),
        _ => Err(Problem::new(StatusCode::NOT_FOUND, "Not Found", "resource not found")
            .with_code("not_found")),
    }
}
