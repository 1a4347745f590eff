//! Contact Form Example
//!
//! A server-rendered form protected by `CsrfLayer`:
//!
//! - **Askama Templates**: the hidden token field comes from `TemplateContext`
//! - **View Globals**: `RequestGlobals` hands the rendered field to templates as `csrf`
//! - **Custom Failures**: rejected submissions re-render the form with a 403
//!
//! ## Running
//!
//! ```bash
//! ACTON_SESSION__SECURE=false cargo run --manifest-path=acton-csrf/Cargo.toml \
//!   --example contact-form
//! ```
//!
//! Then open http://localhost:8080 in your browser.

use acton_csrf::prelude::*;
use axum::{extract::Form, http::StatusCode};
use serde::Deserialize;

// ============================================================================
// Templates
// ============================================================================

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!doctype html>
<html>
<head>
  <title>Contact</title>
  {{ ctx.csrf_meta()|safe }}
</head>
<body>
  {% if let Some(notice) = notice %}<p class="notice">{{ notice }}</p>{% endif %}
  <form method="post" action="/">
    {{ ctx.csrf_field()|safe }}
    <input name="email" type="email" placeholder="you@example.com">
    <textarea name="message"></textarea>
    <button type="submit">Send</button>
  </form>
</body>
</html>"#
)]
struct ContactPage {
    ctx: TemplateContext,
    notice: Option<String>,
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!doctype html>
<p>Thanks {{ email }}, we received your message.</p>
<a href="/">Send another</a>"#
)]
struct ThanksPage {
    email: String,
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct ContactForm {
    email: String,
    message: String,
}

async fn show_form(ctx: TemplateContext) -> impl IntoResponse {
    HtmlTemplate::page(ContactPage { ctx, notice: None })
}

async fn submit(Form(form): Form<ContactForm>) -> impl IntoResponse {
    tracing::info!(email = %form.email, length = form.message.len(), "Contact message received");
    HtmlTemplate::page(ThanksPage { email: form.email })
}

/// Re-render the form with the fresh token instead of a bare 400.
async fn expired_form(request: axum::http::Request<axum::body::Body>, _next: Next) -> impl IntoResponse {
    let reason = request.extensions().get::<TokenRejection>().copied();
    tracing::info!(reason = ?reason, "Re-rendering contact form after CSRF rejection");

    let token = request
        .extensions()
        .get::<CsrfToken>()
        .map(|token| token.token().to_string())
        .unwrap_or_default();

    HtmlTemplate::page(ContactPage {
        ctx: TemplateContext::new().with_csrf(token),
        notice: Some("Your form expired. Please submit it again.".to_string()),
    })
    .with_status(StatusCode::FORBIDDEN)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let csrf = CsrfLayer::from_config(config.csrf.clone())?
        .with_view(RequestGlobals)
        .with_error_handler(expired_form);

    let app = Router::new()
        .route("/", get(show_form).post(submit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: Error| async move { err.into_response() }))
                .layer(csrf),
        )
        .layer(create_memory_session_layer(&config.session));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    tracing::info!("Contact form listening on http://127.0.0.1:8080");
    axum::serve(listener, app).await?;

    Ok(())
}
