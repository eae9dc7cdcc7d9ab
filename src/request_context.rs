use std::cell::RefCell;
use std::future::Future;

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identity and path, made available to error rendering via a
/// task-local so the shared error body can report the offending path.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub path: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            path: path.into(),
        }
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_CONTEXT: RefCell<Option<RequestContext>>;
}

pub async fn scope_request_context<Fut, R>(context: RequestContext, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_CONTEXT
        .scope(RefCell::new(Some(context)), future)
        .await
}

pub fn current_request_context() -> Option<RequestContext> {
    CURRENT_REQUEST_CONTEXT
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Middleware that assigns every request an ID (honoring an incoming
/// `x-request-id`), scopes the task-local context, and echoes the ID back on
/// the response.
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = RequestContext::new(request_id.clone(), request.uri().path());

    request.extensions_mut().insert(context.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    );

    let mut response = scope_request_context(context, next.run(request))
        .instrument(span)
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        tracing::info_span!(
            "http.request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// HTTP tracing layer with the request-id-aware span maker.
pub fn configure_http_tracing(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>, RequestSpanMaker>
{
    TraceLayer::new_for_http().make_span_with(RequestSpanMaker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn context_handler() -> (StatusCode, String) {
        let ctx = current_request_context().expect("context should be scoped");
        (StatusCode::OK, format!("{}:{}", ctx.request_id, ctx.path))
    }

    #[tokio::test]
    async fn middleware_scopes_context_and_sets_header() {
        let app = Router::new()
            .route("/ping", get(context_handler))
            .layer(axum::middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header(REQUEST_ID_HEADER, "req-abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "req-abc"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), "req-abc:/ping");
    }

    #[tokio::test]
    async fn middleware_generates_request_id_when_absent() {
        let app = Router::new()
            .route("/ping", get(context_handler))
            .layer(axum::middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get(REQUEST_ID_HEADER).is_some());
    }
}
