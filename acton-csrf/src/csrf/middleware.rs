//! Tower layer validating and rotating CSRF tokens.

use std::{
    convert::Infallible,
    fmt,
    future::Future,
    marker::PhantomData,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{HeaderName, Request},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tower_sessions::Session;

use super::{
    body::{parse_request, ParsedBody, SubmittedToken},
    handler::{
        boxed_handler, default_error_response, unreadable_body_response, ErrorHandler, Next,
        TokenRejection,
    },
    is_mutating, CsrfToken, CSRF_FIELD_NAME, CSRF_VIEW_GLOBAL,
};
use crate::config::CsrfConfig;
use crate::error::{Error, Result};
use crate::session::SessionBackend;
use crate::view::ViewAdapter;

#[derive(Clone)]
struct Settings {
    token_length: usize,
    error_message: String,
    header_name: Option<HeaderName>,
    max_body_bytes: usize,
    error_handler: Option<ErrorHandler>,
    view: Option<Arc<dyn ViewAdapter>>,
}

impl Settings {
    fn from_config(config: CsrfConfig) -> Result<Self> {
        config.validate()?;

        let header_name = config
            .header_name
            .as_deref()
            .map(HeaderName::try_from)
            .transpose()
            .map_err(|e| Error::InvalidConfig(format!("csrf.header_name: {e}")))?;

        Ok(Self {
            token_length: config.token_length,
            error_message: config.error_message,
            header_name,
            max_body_bytes: config.max_body_bytes,
            error_handler: None,
            view: None,
        })
    }

    fn submitted_token(&self, request: &Request<Body>, body: &ParsedBody) -> SubmittedToken {
        let submitted = SubmittedToken::from_body(body, CSRF_FIELD_NAME);
        match &self.header_name {
            Some(header) if submitted.is_missing() => {
                SubmittedToken::from_header(request.headers(), header.as_str())
            }
            _ => submitted,
        }
    }

    async fn check<B>(&self, session: &B, submitted: SubmittedToken) -> Result<Option<TokenRejection>>
    where
        B: SessionBackend,
    {
        let value = match submitted {
            SubmittedToken::Missing => return Ok(Some(TokenRejection::Missing)),
            SubmittedToken::NonString => return Ok(Some(TokenRejection::NonString)),
            SubmittedToken::Value(value) => value,
        };

        Ok(match CsrfToken::stored(session).await? {
            Some(stored) if stored.matches(&value) => None,
            _ => Some(TokenRejection::Mismatch),
        })
    }

    async fn process<B, S>(&self, request: Request<Body>, mut inner: S) -> Result<Response>
    where
        B: SessionBackend + Clone + 'static,
        S: Service<Request<Body>, Response = Response, Error = Infallible> + Send + 'static,
        S::Future: Send + 'static,
    {
        let session = match request.extensions().get::<B>() {
            Some(session) if session.is_active() => session.clone(),
            _ => {
                tracing::error!(
                    method = %request.method(),
                    path = request.uri().path(),
                    "CSRF middleware invoked without an active session"
                );
                return Err(Error::SessionInactive);
            }
        };

        let (mut request, rejection) = if is_mutating(request.method()) {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            match parse_request(request, self.max_body_bytes).await {
                Ok((request, body)) => {
                    let submitted = self.submitted_token(&request, &body);
                    let rejection = self.check(&session, submitted).await?;
                    (request, rejection)
                }
                Err(err) => {
                    // The body was consumed, so the request cannot be forwarded anywhere.
                    CsrfToken::regenerate(&session, self.token_length).await?;
                    tracing::warn!(
                        error = %err,
                        limit = self.max_body_bytes,
                        method = %method,
                        path = %path,
                        "Failed to buffer request body for CSRF validation"
                    );
                    return Ok(unreadable_body_response());
                }
            }
        } else {
            (request, None)
        };

        let token = CsrfToken::regenerate(&session, self.token_length).await?;
        request.extensions_mut().insert(token.clone());

        if let Some(reason) = rejection {
            tracing::warn!(
                reason = %reason,
                method = %request.method(),
                path = request.uri().path(),
                "CSRF token validation failed"
            );
            request.extensions_mut().insert(reason);

            return Ok(match &self.error_handler {
                Some(handler) => handler(request, Next::new(inner)).await,
                None => default_error_response(&self.error_message),
            });
        }

        if let Some(view) = &self.view {
            view.set_global(
                request.extensions_mut(),
                CSRF_VIEW_GLOBAL,
                &token.as_hidden_field(),
            );
        }

        match inner.call(request).await {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }
}

/// CSRF protection middleware layer.
///
/// Validates the `csrf_token` form field on POST/PUT/DELETE/PATCH requests
/// against the token stored in the session, then stores a fresh token for the
/// next request. The session is read from the request extensions; `B` is the
/// session handle type, [`tower_sessions::Session`] by default.
///
/// Requests reaching the layer without an active session fail with
/// [`Error::SessionInactive`]. In axum, put a `HandleErrorLayer` in front of it.
///
/// # Example
///
/// ```rust,ignore
/// use acton_csrf::prelude::*;
///
/// let csrf = CsrfLayer::from_config(config.csrf.clone())?
///     .with_error_message("Your form expired, please try again.")
///     .with_view(RequestGlobals);
///
/// let app = Router::new()
///     .route("/form", get(show_form).post(handle_form))
///     .layer(
///         ServiceBuilder::new()
///             .layer(HandleErrorLayer::new(|err: Error| async move { err.into_response() }))
///             .layer(csrf),
///     );
/// ```
pub struct CsrfLayer<B = Session> {
    settings: Arc<Settings>,
    _session: PhantomData<fn() -> B>,
}

impl CsrfLayer {
    /// Create a CSRF layer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: Arc::new(Settings {
                token_length: super::DEFAULT_TOKEN_LENGTH,
                error_message: super::DEFAULT_ERROR_MESSAGE.to_string(),
                header_name: None,
                max_body_bytes: CsrfConfig::default().max_body_bytes,
                error_handler: None,
                view: None,
            }),
            _session: PhantomData,
        }
    }

    /// Create a CSRF layer from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate.
    pub fn from_config(config: CsrfConfig) -> Result<Self> {
        Ok(Self {
            settings: Arc::new(Settings::from_config(config)?),
            _session: PhantomData,
        })
    }
}

impl Default for CsrfLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> CsrfLayer<B> {
    /// Read the session from a different handle type in the request extensions.
    #[must_use]
    pub fn with_backend<B2>(self) -> CsrfLayer<B2> {
        CsrfLayer {
            settings: self.settings,
            _session: PhantomData,
        }
    }

    /// Replace the response sent when validation fails.
    ///
    /// The handler receives the request, with the fresh [`CsrfToken`] and the
    /// [`TokenRejection`] in its extensions, and the rest of the chain.
    #[must_use]
    pub fn with_error_handler<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Arc::make_mut(&mut self.settings).error_handler = Some(boxed_handler(handler));
        self
    }

    /// Set the body of the default 400 response.
    ///
    /// Has no effect once a custom error handler is installed.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.settings).error_message = message.into();
        self
    }

    /// Hand the rendered hidden field to a view adapter on every forwarded request.
    #[must_use]
    pub fn with_view<V: ViewAdapter>(mut self, view: V) -> Self {
        Arc::make_mut(&mut self.settings).view = Some(Arc::new(view));
        self
    }
}

impl<B> Clone for CsrfLayer<B> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            _session: PhantomData,
        }
    }
}

impl<B> fmt::Debug for CsrfLayer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfLayer")
            .field("token_length", &self.settings.token_length)
            .field("error_message", &self.settings.error_message)
            .field("header_name", &self.settings.header_name)
            .field("max_body_bytes", &self.settings.max_body_bytes)
            .field("custom_error_handler", &self.settings.error_handler.is_some())
            .field("view", &self.settings.view.is_some())
            .finish()
    }
}

impl<S, B> Layer<S> for CsrfLayer<B> {
    type Service = CsrfMiddleware<S, B>;

    fn layer(&self, inner: S) -> Self::Service {
        CsrfMiddleware {
            inner,
            settings: Arc::clone(&self.settings),
            _session: PhantomData,
        }
    }
}

/// CSRF middleware service.
pub struct CsrfMiddleware<S, B = Session> {
    inner: S,
    settings: Arc<Settings>,
    _session: PhantomData<fn() -> B>,
}

impl<S: Clone, B> Clone for CsrfMiddleware<S, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            settings: Arc::clone(&self.settings),
            _session: PhantomData,
        }
    }
}

impl<S: fmt::Debug, B> fmt::Debug for CsrfMiddleware<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfMiddleware")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, B> Service<Request<Body>> for CsrfMiddleware<S, B>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: SessionBackend + Clone + 'static,
{
    type Response = Response;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Response>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx).map_err(|never| match never {})
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let settings = Arc::clone(&self.settings);
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { settings.process::<B, S>(request, inner).await })
    }
}
