use axum::http::StatusCode;
use tenant_context::{TenancyError, TenantContext};

use crate::api::rest::problem::Problem;
use crate::domain::error::DomainError;

pub type ApiResult<T> = Result<T, Problem>;

/// Map a domain error to an RFC 9457 Problem.
///
/// Isolation failures (`NoTenantBound`, `RebindConflict`, ...) are bugs in
/// the request pipeline, not client errors: they surface as 500 and are
/// logged at `error`.
pub fn domain_error_to_problem(e: &DomainError, instance: &str) -> Problem {
    let problem = match e {
        DomainError::NotFound(key) => Problem::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            format!("tenant not found: {key}"),
        )
        .with_code("tenant_not_found"),
        DomainError::InvalidDomain { domain, reason } => Problem::new(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            format!("invalid domain '{domain}': {reason}"),
        )
        .with_code("invalid_domain"),
        DomainError::DomainTaken(domain) => Problem::new(
            StatusCode::CONFLICT,
            "Conflict",
            format!("domain already taken: {domain}"),
        )
        .with_code("domain_taken"),
        DomainError::Validation { field, message } => Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Validation Failed",
            format!("Validation error on '{field}': {message}"),
        )
        .with_code("validation"),
        DomainError::StoreUnavailable(msg) => {
            tracing::warn!(error = %msg, "tenant store unavailable");
            Problem::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable",
                "tenant store is temporarily unavailable",
            )
            .with_code("store_unavailable")
        }
        DomainError::Denied(msg) => {
            tracing::warn!(reason = msg, "tenant-scoped access denied");
            // Do not reveal rows that exist for another tenant.
            Problem::new(StatusCode::NOT_FOUND, "Not Found", "resource not found")
                .with_code("not_found")
        }
        DomainError::Tenancy(t) => tenancy_problem(*t),
        DomainError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            internal()
        }
    };

    let problem = problem.with_instance(instance);
    match TenantContext::request_id() {
        Some(rid) => problem.with_request_id(rid.as_ref()),
        None => problem,
    }
}

fn tenancy_problem(e: TenancyError) -> Problem {
    tracing::error!(error = %e, leak = e.is_leak(), "tenant isolation failure");
    internal().with_code("tenant_context")
}

fn internal() -> Problem {
    Problem::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        "an internal error occurred",
    )
    .with_code("internal")
}

impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(&e, "/")
    }
}
