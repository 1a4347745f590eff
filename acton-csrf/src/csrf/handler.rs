//! Validation failure handling.

use std::{convert::Infallible, fmt, future::Future, sync::Arc};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use tower::{util::BoxService, Service, ServiceExt};

/// Why a mutating request was rejected.
///
/// Available to error handlers through the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// No token was submitted
    Missing,
    /// The token field was not a single string
    NonString,
    /// The submitted token differs from the one in the session
    Mismatch,
}

impl TokenRejection {
    /// Short machine-readable reason, used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NonString => "non_string",
            Self::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rest of the middleware chain.
///
/// Error handlers receive it so they can decide to continue the chain anyway,
/// for example to only report failures while rolling out protection.
pub struct Next {
    inner: BoxService<Request<Body>, Response, Infallible>,
}

impl Next {
    pub(crate) fn new<S>(inner: S) -> Self
    where
        S: Service<Request<Body>, Response = Response, Error = Infallible> + Send + 'static,
        S::Future: Send + 'static,
    {
        Self {
            inner: BoxService::new(inner),
        }
    }

    /// Run the remaining handlers.
    pub async fn run(self, request: Request<Body>) -> Response {
        match self.inner.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Strategy invoked instead of the next handler when validation fails.
pub type ErrorHandler = Arc<dyn Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Send + Sync>;

pub(crate) fn boxed_handler<F, Fut, R>(handler: F) -> ErrorHandler
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |request, next| {
        let fut = handler(request, next);
        Box::pin(async move { fut.await.into_response() })
    })
}

/// Response sent by the default error handler: 400 with a plain-text body.
#[must_use]
pub fn default_error_response(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.to_string(),
    )
        .into_response()
}

/// Response sent when the body could not be buffered for validation.
pub(crate) fn unreadable_body_response() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Request body too large.",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::service_fn;

    #[test]
    fn test_rejection_reason() {
        assert_eq!(TokenRejection::Missing.to_string(), "missing");
        assert_eq!(TokenRejection::NonString.to_string(), "non_string");
        assert_eq!(TokenRejection::Mismatch.to_string(), "mismatch");
    }

    #[tokio::test]
    async fn test_default_error_response() {
        let response = default_error_response("Invalid security token.");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Invalid security token.");
    }

    #[test]
    fn test_unreadable_body_response() {
        let response = unreadable_body_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_next_runs_inner_service() {
        let next = Next::new(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(StatusCode::ACCEPTED.into_response())
        }));

        let response = next.run(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_boxed_handler_converts_response() {
        let handler = boxed_handler(|_req, _next| async { (StatusCode::FORBIDDEN, "nope") });
        let next = Next::new(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        }));

        let response = handler(Request::new(Body::empty()), next).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
