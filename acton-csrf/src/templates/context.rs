//! Template context carrying the CSRF token into Askama templates.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::csrf::{CsrfToken, CSRF_VIEW_GLOBAL};
use crate::view::TemplateGlobals;

/// Common context data available to all templates.
///
/// Extracted from the request after `CsrfLayer` ran, it holds the token just
/// stored in the session and the globals set by [`RequestGlobals`](crate::view::RequestGlobals).
///
/// # Example
///
/// ```rust,ignore
/// use acton_csrf::templates::{HtmlTemplate, Template, TemplateContext};
///
/// #[derive(Template)]
/// #[template(path = "contact.html")]
/// struct ContactTemplate {
///     ctx: TemplateContext,
/// }
///
/// async fn contact(ctx: TemplateContext) -> impl IntoResponse {
///     HtmlTemplate::page(ContactTemplate { ctx })
/// }
/// ```
///
/// ```html
/// <form method="post">
///   {{ ctx.csrf_field()|safe }}
///   <button>Send</button>
/// </form>
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// CSRF token for form protection.
    pub csrf_token: Option<String>,

    /// Globals set by view adapters for this request.
    pub globals: TemplateGlobals,
}

impl TemplateContext {
    /// Create a new empty template context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set CSRF token.
    #[must_use]
    pub fn with_csrf(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Add a global.
    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.insert(name, value);
        self
    }

    /// Look up a global by name.
    #[must_use]
    pub fn global(&self, name: &str) -> &str {
        self.globals.get(name).unwrap_or_default()
    }

    /// Hidden CSRF input field HTML.
    ///
    /// Returns `<input type="hidden" name="csrf_token" value="...">`, or an
    /// empty string when no token is available.
    #[must_use]
    pub fn csrf_field(&self) -> String {
        if let Some(field) = self.globals.get(CSRF_VIEW_GLOBAL) {
            return field.to_string();
        }

        self.csrf_token
            .as_deref()
            .map(|token| CsrfToken::new(token).as_hidden_field())
            .unwrap_or_default()
    }

    /// CSRF meta tag HTML, or an empty string when no token is available.
    #[must_use]
    pub fn csrf_meta(&self) -> String {
        self.csrf_token
            .as_deref()
            .map(|token| CsrfToken::new(token).as_meta_tag())
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for TemplateContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            csrf_token: parts
                .extensions
                .get::<CsrfToken>()
                .map(|token| token.token().to_string()),
            globals: parts
                .extensions
                .get::<TemplateGlobals>()
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_context_builder() {
        let ctx = TemplateContext::new()
            .with_global("theme", "dark")
            .with_csrf("token123");

        assert_eq!(ctx.global("theme"), "dark");
        assert_eq!(ctx.global("missing"), "");
        assert_eq!(ctx.csrf_token, Some("token123".to_string()));
    }

    #[test]
    fn test_csrf_field_from_token() {
        let ctx = TemplateContext::new().with_csrf("test-token");
        assert_eq!(
            ctx.csrf_field(),
            r#"<input type="hidden" name="csrf_token" value="test-token">"#
        );
    }

    #[test]
    fn test_csrf_field_prefers_view_global() {
        let ctx = TemplateContext::new()
            .with_csrf("stale")
            .with_global(CSRF_VIEW_GLOBAL, r#"<input type="hidden" name="csrf_token" value="fresh">"#);
        assert!(ctx.csrf_field().contains("fresh"));
    }

    #[test]
    fn test_csrf_helpers_without_token() {
        let ctx = TemplateContext::new();
        assert_eq!(ctx.csrf_field(), "");
        assert_eq!(ctx.csrf_meta(), "");
    }

    #[tokio::test]
    async fn test_extract_from_request() {
        let mut request = http::Request::builder()
            .uri("/contact?x=1")
            .body(())
            .unwrap();
        request.extensions_mut().insert(CsrfToken::new("abc"));
        let (mut parts, _) = request.into_parts();

        let ctx = TemplateContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.csrf_token.as_deref(), Some("abc"));
        assert!(ctx.csrf_meta().contains("abc"));
    }
}
