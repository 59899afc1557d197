//! `X-Request-ID` handling.
//!
//! [`MakeReqId`] is plugged into `tower_http`'s `SetRequestIdLayer`: an
//! inbound id is kept, otherwise a UUID v4 is generated. Ids that
//! [`from_headers`] would refuse are stripped first by [`discard_unusable`],
//! so the echoed header, error bodies and deferred work all report the same
//! generated id. The admission middleware copies the id into the unit of work.

use axum::extract::Request as AxumRequest;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Longest inbound id that is propagated as is.
const MAX_REQUEST_ID_LEN: usize = 128;

#[must_use]
pub fn header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The request id carried by `headers`, if usable.
#[must_use]
pub fn from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
}

/// `map_request` step that runs ahead of `SetRequestIdLayer`.
#[allow(clippy::unused_async)]
pub async fn discard_unusable(mut req: AxumRequest) -> AxumRequest {
    if req.headers().contains_key(X_REQUEST_ID) && from_headers(req.headers()).is_none() {
        tracing::debug!("discarding unusable inbound request id");
        req.headers_mut().remove(X_REQUEST_ID);
    }
    req
}
