//! Correlation id middleware
//!
//! Seeds a [`RequestContext`] for every inbound request and runs the rest of
//! the request inside it:
//! - the `x-correlation-id` header is used when present and non-blank, with
//!   any UTF-8 bytes kept as sent
//! - otherwise a UUID v4 is generated
//! - the user id comes from a [`UserId`] extension attached by an earlier layer
//! - the effective correlation id is echoed on the response

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{from_fn, Next},
    response::Response,
    Router,
};
use conduit_core::{context, RequestContext, CORRELATION_HEADER};
use tracing::{info_span, Instrument};

/// Authenticated user id, inserted as a request extension by whatever
/// authenticates the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

pub async fn correlation_middleware(request: Request, next: Next) -> Response {
    let inbound = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok());
    let user_id = request.extensions().get::<UserId>().map(|u| u.0.clone());
    let request_context = RequestContext::seed(inbound, user_id);
    let correlation_id = request_context.correlation_id().to_string();

    let span = info_span!(
        "request",
        correlation_id = %correlation_id,
        http.method = %request.method(),
        http.target = %request.uri().path(),
    );

    let mut response = context::run(request_context, next.run(request))
        .instrument(span)
        .await;

    match HeaderValue::from_bytes(correlation_id.as_bytes()) {
        Ok(value) => {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }
        Err(e) => {
            tracing::warn!(correlation_id = %correlation_id, error = %e, "Correlation id is not a valid header value");
        }
    }
    response
}

/// Wrap every route of `router` with [`correlation_middleware`].
pub fn with_correlation<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn(correlation_middleware))
}
