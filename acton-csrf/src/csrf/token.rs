//! Token value type.

use axum::{extract::FromRequestParts, http::request::Parts};
use rand::RngCore;
use subtle::ConstantTimeEq;

use super::{CSRF_FIELD_NAME, CSRF_SESSION_KEY};
use crate::error::Error;
use crate::session::SessionBackend;

/// CSRF token for the current request.
///
/// The middleware attaches the token it just stored in the session to the
/// request extensions; handlers extract it to embed it in forms or headers.
///
/// # Example
///
/// ```rust,ignore
/// async fn form(csrf: CsrfToken) -> impl IntoResponse {
///     Html(format!(r#"
///         <form method="post">
///             {}
///             <button>Submit</button>
///         </form>
///     "#, csrf.as_hidden_field()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Create a new CSRF token with the given value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token string.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Generate HTML for the hidden form field.
    ///
    /// Returns `<input type="hidden" name="csrf_token" value="...">`.
    #[must_use]
    pub fn as_hidden_field(&self) -> String {
        format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            CSRF_FIELD_NAME,
            html_escape(&self.0)
        )
    }

    /// Generate HTML for a meta tag.
    ///
    /// Use this in the document head for JavaScript/HTMX access.
    #[must_use]
    pub fn as_meta_tag(&self) -> String {
        format!(
            r#"<meta name="csrf-token" content="{}">"#,
            html_escape(&self.0)
        )
    }

    /// Compare a submitted value with this token in constant time.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        bool::from(self.0.as_bytes().ct_eq(submitted.as_bytes()))
    }

    /// Generate a new token from `length` random bytes, hex-encoded.
    #[must_use]
    pub fn generate(length: usize) -> Self {
        let mut bytes = vec![0u8; length];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Generate a new token and store it in the session, replacing the previous one.
    pub async fn regenerate<B>(session: &B, length: usize) -> Result<Self, Error>
    where
        B: SessionBackend + ?Sized,
    {
        let token = Self::generate(length);
        session.set(CSRF_SESSION_KEY, token.token()).await?;
        tracing::debug!("CSRF token rotated");
        Ok(token)
    }

    /// Read the token currently stored in the session, if any.
    pub async fn stored<B>(session: &B) -> Result<Option<Self>, Error>
    where
        B: SessionBackend + ?Sized,
    {
        Ok(session.get(CSRF_SESSION_KEY).await?.map(Self))
    }
}

impl std::fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CsrfToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CsrfToken>()
            .cloned()
            .ok_or(Error::TokenUnavailable)
    }
}

/// Basic HTML escaping for attribute values.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_token_generation() {
        let token = CsrfToken::generate(20);
        assert_eq!(token.token().len(), 40);
        assert!(token.token().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let token2 = CsrfToken::generate(20);
        assert_ne!(token.token(), token2.token());
    }

    #[test]
    fn test_csrf_token_length_follows_config() {
        assert_eq!(CsrfToken::generate(16).token().len(), 32);
        assert_eq!(CsrfToken::generate(32).token().len(), 64);
    }

    #[test]
    fn test_csrf_token_html_output() {
        let token = CsrfToken::new("abc123");

        assert_eq!(
            token.as_hidden_field(),
            r#"<input type="hidden" name="csrf_token" value="abc123">"#
        );

        let meta = token.as_meta_tag();
        assert!(meta.contains("name=\"csrf-token\""));
        assert!(meta.contains("content=\"abc123\""));
    }

    #[test]
    fn test_matches() {
        let token = CsrfToken::new("abc");
        assert!(token.matches("abc"));
        assert!(!token.matches("abd"));
        assert!(!token.matches("ab"));
        assert!(!token.matches("abcd"));
        assert!(!token.matches(""));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(html_escape("a&b"), "a&amp;b");
        assert_eq!(html_escape("0a1b2c"), "0a1b2c");
    }

    #[tokio::test]
    async fn test_extractor_requires_middleware() {
        let (mut parts, _) = http::Request::new(()).into_parts();
        let result = CsrfToken::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(Error::TokenUnavailable)));

        parts.extensions.insert(CsrfToken::new("abc"));
        let token = CsrfToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.token(), "abc");
    }
}
