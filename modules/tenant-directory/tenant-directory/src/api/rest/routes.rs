use std::sync::Arc;

use axum::middleware::{from_fn_with_state, map_request};
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::tenant_admission;
use super::request_id::{self, MakeReqId};
use crate::domain::registry::TenantRegistry;
use crate::domain::service::TenantDirectory;
use crate::domain::site_config::SiteConfigService;

#[derive(Clone)]
pub struct ApiState {
    pub directory: Arc<TenantDirectory>,
    pub site_configs: Arc<SiteConfigService>,
    /// Mounts `/api/central/tenants` when present.
    pub registry: Option<Arc<TenantRegistry>>,
}

/// Full HTTP surface.
///
/// Layers, outermost first: request id → trace → tenant admission → handler.
/// Unusable inbound request ids are dropped before a new one is assigned.
/// `/health` is not subject to admission.
pub fn router(state: ApiState) -> Router {
    with_tenant_routes(state, Router::new())
}

/// [`router`] with `extra` mounted behind tenant admission, so its handlers
/// run inside the admitted unit of work like the built-in ones.
pub fn with_tenant_routes(state: ApiState, extra: Router) -> Router {
    let mut api = Router::new()
        .route("/api/tenant", get(handlers::current_tenant))
        .route(
            "/api/site-config",
            get(handlers::get_site_config).put(handlers::update_site_config),
        );

    if let Some(registry) = state.registry {
        api = api
            .route(
                "/api/central/tenants",
                get(handlers::list_tenants).post(handlers::create_tenant),
            )
            .route("/api/central/tenants/stats", get(handlers::tenant_stats))
            .route(
                "/api/central/tenants/{id}",
                get(handlers::get_tenant)
                    .put(handlers::update_tenant)
                    .delete(handlers::delete_tenant),
            )
            .layer(Extension(registry));
    }

    let api = api
        .merge(extra)
        .layer(Extension(state.site_configs))
        .layer(from_fn_with_state(state.directory, tenant_admission));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                let rid = req
                    .headers()
                    .get(request_id::X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id::header()))
        .layer(SetRequestIdLayer::new(request_id::header(), MakeReqId))
        .layer(map_request(request_id::discard_unusable))
}
