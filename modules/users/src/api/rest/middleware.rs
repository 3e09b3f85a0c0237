use axum::{
    body::Body,
    http::{HeaderName, Request},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::rest::reporter;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP-level knobs taken from the `server` config section.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_enabled: bool,
    pub body_limit_bytes: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_enabled: true,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Clone, Default)]
pub struct NanoRequestId;

impl MakeRequestId for NanoRequestId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

fn request_span(req: &Request<Body>) -> tracing::Span {
    let rid = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("n/a");
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %rid,
    )
}

/// Wrap `router` in the service middleware.
///
/// Outermost to innermost:
/// SetRequestId -> PropagateRequestId -> Trace -> CatchPanic -> CORS -> BodyLimit.
/// `Router::layer` wraps everything added so far, so layers are added innermost first.
pub fn apply(router: Router, opts: &HttpOptions) -> Router {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);

    let mut router = router.layer(RequestBodyLimitLayer::new(opts.body_limit_bytes));

    if opts.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(CatchPanicLayer::custom(reporter::handle_panic))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(SetRequestIdLayer::new(header, NanoRequestId))
}
