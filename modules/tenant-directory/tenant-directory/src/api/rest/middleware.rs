//! Tenant admission: every request is resolved to a tenant (or admitted as a
//! central request) before any handler runs, and the rest of the request
//! executes inside its own unit of work.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::uri::Authority;
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tenant_context::{TenantContext, TenantId};
use tracing::Instrument;

use crate::api::rest::error::domain_error_to_problem;
use crate::api::rest::problem::Problem;
use crate::api::rest::request_id;
use crate::domain::error::DomainError;
use crate::domain::service::TenantDirectory;

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// How the current request was admitted. Inserted into request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admin host from `central_domains`; the unit stays unbound.
    Central,
    Tenant(TenantId),
}

/// Request host: first `X-Forwarded-Host` value, else `Host`, else the URI
/// authority. Port not stripped.
#[must_use]
pub fn request_host(headers: &HeaderMap, uri_authority: Option<&str>) -> Option<String> {
    let forwarded = headers
        .get(X_FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .or(uri_authority)
        .map(ToOwned::to_owned)
}

/// `host:port` → `host`. IPv6 literals are returned unchanged and rejected
/// later by domain validation.
#[must_use]
pub fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}

/// Axum middleware. Use with `from_fn_with_state(directory, tenant_admission)`.
pub async fn tenant_admission(
    State(directory): State<Arc<TenantDirectory>>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id: Arc<str> = request_id::from_headers(req.headers())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToOwned::to_owned)
        .into();
    let path = req.uri().path().to_owned();

    let Some(host) = request_host(req.headers(), req.uri().authority().map(Authority::as_str)) else {
        tracing::debug!(request_id = %request_id, "request without host");
        return Problem::new(StatusCode::BAD_REQUEST, "Bad Request", "missing Host header")
            .with_code("missing_host")
            .with_instance(path)
            .with_request_id(request_id.as_ref())
            .into_response();
    };

    let span = tracing::info_span!(
        "tenant_admission",
        request_id = %request_id,
        host = %host,
        tenant.id = tracing::field::Empty,
    );

    async move {
        let domain = match directory.normalize(strip_port(&host)) {
            Ok(domain) => domain,
            Err(e) => return reject(&e, &path, &request_id).await,
        };

        if directory.is_central(&domain) {
            tracing::debug!(domain = %domain, "central request admitted unbound");
            req.extensions_mut().insert(Admission::Central);
            return TenantContext::unit_with_request_id(request_id, next.run(req)).await;
        }

        let tenant = match directory.resolve(&domain).await {
            Ok(tenant) => tenant,
            Err(e) => return reject(&e, &path, &request_id).await,
        };
        tracing::Span::current().record("tenant.id", tracing::field::display(tenant.id));

        let tenant_id = tenant.id;
        req.extensions_mut().insert(Admission::Tenant(tenant_id));
        req.extensions_mut().insert(tenant);
        match TenantContext::run_with_request_id(tenant_id, Some(request_id.clone()), next.run(req))
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "could not open unit of work for request");
                reject(&e.into(), &path, &request_id).await
            }
        }
    }
    .instrument(span)
    .await
}

/// Build the rejection inside a unit carrying the request id.
async fn reject(e: &DomainError, path: &str, request_id: &Arc<str>) -> Response {
    TenantContext::unit_with_request_id(request_id.clone(), async {
        domain_error_to_problem(e, path).into_response()
    })
    .await
}
