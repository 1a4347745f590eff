//! Askama template engine integration.
//!
//! [`TemplateContext`] carries the token stored by `CsrfLayer` into templates,
//! and [`HtmlTemplate`] renders them as responses.
//!
//! ```html
//! <!-- templates/contact.html -->
//! <head>{{ ctx.csrf_meta()|safe }}</head>
//! <form method="post" action="/contact">
//!   {{ ctx.csrf_field()|safe }}
//!   <textarea name="message"></textarea>
//!   <button type="submit">Send</button>
//! </form>
//! ```

mod context;
mod response;

pub use context::TemplateContext;
pub use response::HtmlTemplate;

// Re-export askama Template derive for convenience
pub use askama::Template;
