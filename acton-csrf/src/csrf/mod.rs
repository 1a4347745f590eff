//! CSRF (Cross-Site Request Forgery) protection.
//!
//! A token is generated for every request, stored in the session and attached
//! to the request. Mutating requests (POST, PUT, DELETE, PATCH) must echo the
//! token that was stored during the previous request in the form field
//! `csrf_token`; anything else is answered by the error handler.
//!
//! # How it works
//!
//! 1. `CsrfLayer` checks that a session is active, failing the request with
//!    [`Error::SessionInactive`](crate::error::Error::SessionInactive) otherwise
//! 2. Mutating requests are validated against the token in the session
//! 3. A fresh token is generated and stored whatever the outcome
//! 4. Handlers read it through the `CsrfToken` extractor; view adapters receive
//!    the rendered hidden field under the `csrf` global
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_csrf::prelude::*;
//!
//! async fn form_page(csrf: CsrfToken) -> impl IntoResponse {
//!     Html(format!(r#"
//!         <form method="post">
//!             {}
//!             <input type="text" name="data">
//!             <button type="submit">Submit</button>
//!         </form>
//!     "#, csrf.as_hidden_field()))
//! }
//!
//! let app = Router::new()
//!     .route("/form", get(form_page).post(handle_form))
//!     .layer(
//!         ServiceBuilder::new()
//!             .layer(HandleErrorLayer::new(|err: Error| async move { err.into_response() }))
//!             .layer(CsrfLayer::default()),
//!     )
//!     .layer(create_memory_session_layer(&SessionConfig::default()));
//! ```

mod body;
mod handler;
mod middleware;
mod token;

pub use body::{ParsedBody, SubmittedToken};
pub use handler::{default_error_response, ErrorHandler, Next, TokenRejection};
pub use middleware::{CsrfLayer, CsrfMiddleware};
pub use token::CsrfToken;

/// Form field carrying the submitted token.
pub const CSRF_FIELD_NAME: &str = "csrf_token";

/// Session key the token is stored under.
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Name of the view global receiving the rendered hidden field.
pub const CSRF_VIEW_GLOBAL: &str = "csrf";

/// Default body of the 400 response sent on validation failure.
pub const DEFAULT_ERROR_MESSAGE: &str = "Invalid security token.";

/// Default number of random bytes per token.
pub const DEFAULT_TOKEN_LENGTH: usize = 20;

/// Smallest accepted token length in bytes.
pub const MIN_TOKEN_LENGTH: usize = 16;

/// Largest accepted token length in bytes.
pub const MAX_TOKEN_LENGTH: usize = 64;

/// Methods whose requests must carry a valid token.
pub const MUTATING_METHODS: [http::Method; 4] = [
    http::Method::POST,
    http::Method::PUT,
    http::Method::DELETE,
    http::Method::PATCH,
];

/// Whether requests with this method are subject to token validation.
#[must_use]
pub fn is_mutating(method: &http::Method) -> bool {
    MUTATING_METHODS.contains(method)
}
