//! Tenant file endpoints, mounted behind tenant admission.
//!
//! - `POST   /api/uploads/{directory}`: raw body, `Content-Type` and optional
//!   `X-File-Name`; answers 201 with the stored relative path
//! - `GET    /api/files/{*path}`
//! - `DELETE /api/files/{*path}`

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tenant_context::TenantContext;
use tenant_directory::api::rest::Problem;
use tenant_files::{LocalFileStorage, StorageError, Upload};

pub const X_FILE_NAME: &str = "x-file-name";

pub fn routes(storage: Arc<LocalFileStorage>) -> Router {
    Router::new()
        .route("/api/uploads/{directory}", post(upload))
        .route("/api/files/{*path}", get(download).delete(remove))
        .with_state(storage)
}

async fn upload(
    State(storage): State<Arc<LocalFileStorage>>,
    Path(directory): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), Problem> {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    };
    let upload = Upload {
        file_name: header_str(X_FILE_NAME),
        content_type: header_str(header::CONTENT_TYPE.as_str()),
        bytes: body,
    };
    let path = storage
        .store(&directory, upload)
        .await
        .map_err(|e| storage_problem(&e))?;
    Ok((StatusCode::CREATED, Json(json!({ "path": path }))))
}

async fn download(
    State(storage): State<Arc<LocalFileStorage>>,
    Path(path): Path<String>,
) -> Result<Response, Problem> {
    let bytes = storage.load(&path).await.map_err(|e| storage_problem(&e))?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

async fn remove(
    State(storage): State<Arc<LocalFileStorage>>,
    Path(path): Path<String>,
) -> Result<StatusCode, Problem> {
    if storage.delete(&path).await.map_err(|e| storage_problem(&e))? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(storage_problem(&StorageError::NotFound(path)))
    }
}

fn storage_problem(e: &StorageError) -> Problem {
    let (status, code) = match e {
        StorageError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
        StorageError::TypeNotAllowed(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "type_not_allowed"),
        StorageError::InvalidDirectory { .. } | StorageError::InvalidPath { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_path")
        }
        // Foreign files are reported like missing ones.
        StorageError::OutsideNamespace(_) | StorageError::NotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        StorageError::Tenancy(t) => {
            tracing::error!(error = %t, leak = t.is_leak(), "tenant isolation failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "tenant_context")
        }
        StorageError::Io(io) => {
            tracing::error!(error = %io, "file storage I/O failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    };

    let detail = if status.is_server_error() {
        "an internal error occurred".to_owned()
    } else {
        e.to_string()
    };
    let title = status.canonical_reason().unwrap_or("Error");
    let problem = Problem::new(status, title, detail).with_code(code);
    match TenantContext::request_id() {
        Some(rid) => problem.with_request_id(rid.as_ref()),
        None => problem,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tenant_context::{TenancyError, TenantId};
    use tenant_db::{DbConfig, TenantDb};
    use tenant_directory::api::rest::{ApiState, with_tenant_routes};
    use tenant_directory::infra::memory::InMemoryTenantStore;
    use tenant_directory::{
        SiteConfigService, TenantDirectory, TenantDirectoryConfig, TenantIdentity,
    };
    use tenant_files::FileStorageConfig;
    use tower::ServiceExt;

    async fn app(base: &std::path::Path) -> Router {
        let store = Arc::new(InMemoryTenantStore::default());
        for (id, domain) in [(1, "a.example"), (2, "b.example")] {
            store.put(TenantIdentity {
                id: TenantId::new(id),
                domain: domain.to_owned(),
                name: domain.to_owned(),
                email: String::new(),
            });
        }
        let directory = Arc::new(TenantDirectory::new(store, &TenantDirectoryConfig::default()));
        let db = TenantDb::connect(&DbConfig::default()).await.unwrap();
        let storage = Arc::new(LocalFileStorage::new(FileStorageConfig {
            base_path: base.to_path_buf(),
            ..Default::default()
        }));
        with_tenant_routes(
            ApiState {
                directory,
                site_configs: Arc::new(SiteConfigService::new(db)),
                registry: None,
            },
            routes(storage),
        )
    }

    fn upload_req(host: &str, directory: &str, content_type: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/uploads/{directory}"))
            .header(header::HOST, host)
            .header(header::CONTENT_TYPE, content_type)
            .header(X_FILE_NAME, "logo.png")
            .body(Body::from("png-bytes"))
            .unwrap()
    }

    fn req(method: &str, host: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn files_are_confined_to_the_admitted_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let resp = app
            .clone()
            .oneshot(upload_req("a.example", "logos", "image/png"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let path = body["path"].as_str().unwrap().to_owned();
        assert!(path.starts_with("1/logos/"));

        let uri = format!("/api/files/{path}");
        let resp = app.clone().oneshot(req("GET", "a.example", &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"png-bytes");

        let resp = app.clone().oneshot(req("GET", "b.example", &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = app.clone().oneshot(req("DELETE", "b.example", &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app.clone().oneshot(req("DELETE", "a.example", &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = app.oneshot(req("DELETE", "a.example", &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let resp = app
            .clone()
            .oneshot(upload_req("a.example", "logos", "text/html"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let resp = app
            .oneshot(upload_req("a.example", ".hidden", "image/png"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (StorageError::TooLarge { size: 2, max: 1 }, 413),
            (StorageError::OutsideNamespace("2/a/b".to_owned()), 404),
            (StorageError::Tenancy(TenancyError::NoTenantBound), 500),
            (StorageError::Io(std::io::Error::other("disk")), 500),
        ];
        for (err, status) in cases {
            assert_eq!(storage_problem(&err).status.as_u16(), status, "{err}");
        }
    }
}
