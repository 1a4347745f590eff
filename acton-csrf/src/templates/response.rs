//! Template response helper.

use askama::Template;
use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

/// Wrapper for rendering templates as HTML responses.
///
/// # Example
///
/// ```rust,ignore
/// async fn contact(ctx: TemplateContext) -> impl IntoResponse {
///     HtmlTemplate::page(ContactTemplate { ctx })
/// }
/// ```
pub struct HtmlTemplate<T: Template> {
    template: T,
    status: StatusCode,
    headers: Vec<(HeaderName, String)>,
}

impl<T: Template> HtmlTemplate<T> {
    /// Create a full page response.
    #[must_use]
    pub fn page(template: T) -> Self {
        Self {
            template,
            status: StatusCode::OK,
            headers: Vec::new(),
        }
    }

    /// Set the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a custom header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.template.render() {
            Ok(html) => {
                let mut response = (self.status, Html(html)).into_response();

                for (name, value) in self.headers {
                    if let Ok(value) = HeaderValue::from_str(&value) {
                        response.headers_mut().insert(name, value);
                    }
                }

                response
            }
            Err(err) => {
                tracing::error!("Template rendering error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<!-- Template error -->".to_string()),
                )
                    .into_response()
            }
        }
    }
}
