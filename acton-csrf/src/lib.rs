//! # acton-csrf
//!
//! Session-bound CSRF protection for server-rendered axum applications.
//!
//! ## Features
//!
//! - **Token rotation**: a fresh random token is stored in the session on every request
//! - **Form validation**: POST/PUT/DELETE/PATCH requests must echo the token in `csrf_token`
//! - **Pluggable failures**: replace the default 400 response or just its message
//! - **View integration**: the rendered hidden field is handed to templates as `csrf`
//! - **Configuration**: Figment-based loading from TOML files and `ACTON_` environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use acton_csrf::prelude::*;
//!
//! async fn form(csrf: CsrfToken) -> Html<String> {
//!     Html(format!(r#"<form method="post">{}<button>Send</button></form>"#, csrf.as_hidden_field()))
//! }
//!
//! async fn submit() -> &'static str {
//!     "Thanks!"
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let app = Router::new()
//!         .route("/", get(form).post(submit))
//!         .layer(
//!             ServiceBuilder::new()
//!                 .layer(HandleErrorLayer::new(|err: Error| async move { err.into_response() }))
//!                 .layer(CsrfLayer::from_config(config.csrf.clone())?),
//!         )
//!         .layer(create_memory_session_layer(&config.session));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod csrf;
pub mod error;
pub mod observability;
pub mod session;
pub mod view;

#[cfg(feature = "askama")]
pub mod templates;

/// Commonly used types and functions
pub mod prelude {
    pub use crate::config::{Config, CsrfConfig, SessionConfig};
    pub use crate::csrf::{CsrfLayer, CsrfMiddleware, CsrfToken, Next, TokenRejection};
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::session::{Session, SessionBackend};
    pub use crate::view::{RequestGlobals, TemplateGlobals, ViewAdapter};

    #[cfg(feature = "session-memory")]
    pub use crate::session::create_memory_session_layer;

    #[cfg(feature = "askama")]
    pub use crate::templates::{HtmlTemplate, Template, TemplateContext};

    pub use axum::{
        error_handling::HandleErrorLayer,
        response::{Html, IntoResponse, Response},
        routing::{get, post},
        Router,
    };
    pub use tower::ServiceBuilder;
}
