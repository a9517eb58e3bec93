//! Cross-cutting HTTP layers applied around the router at startup.

use std::any::Any as PanicPayload;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    BoxError, Router,
};
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::matching::handlers::TOTAL_COUNT_HEADER;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags each request with a fresh UUID v4 unless the client sent one.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([HeaderName::from_static(TOTAL_COUNT_HEADER)])
}

/// Maps an error raised by the layers under `HandleErrorLayer` to the JSON envelope.
fn layer_error(error: BoxError, deadline: Duration) -> AppError {
    if error.is::<Elapsed>() {
        AppError::RequestTimeout(deadline)
    } else {
        AppError::Internal(error.to_string())
    }
}

/// Renders a handler panic as a 500 error envelope.
fn panic_response(panic: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Wraps `router` with request ids, tracing, CORS, panic recovery and the
/// request deadline.
pub fn apply(router: Router, config: &Config) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let deadline = config.request_timeout();

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(cors_layer())
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(HandleErrorLayer::new(move |error: BoxError| async move {
                layer_error(error, deadline)
            }))
            .timeout(deadline),
    )
}
