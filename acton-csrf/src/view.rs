//! View integration.
//!
//! The middleware hands the rendered hidden field to a [`ViewAdapter`] under
//! the `csrf` global. Adapters decide where template engines pick it up.
//! [`RequestGlobals`] keeps globals in the request extensions so each request
//! renders with its own session's token.

use std::collections::HashMap;

use axum::{extract::FromRequestParts, http::request::Parts};
use http::Extensions;

/// Capability implemented by template integrations that accept named
/// string globals.
pub trait ViewAdapter: Send + Sync + 'static {
    /// Make `value` available to templates rendered for this request as `name`.
    fn set_global(&self, extensions: &mut Extensions, name: &str, value: &str);
}

/// Template globals scoped to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateGlobals(HashMap<String, String>);

impl TemplateGlobals {
    /// Create an empty set of globals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a global.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Set a global, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Iterate over all globals.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of globals set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no global is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Adapter storing globals as [`TemplateGlobals`] in the request extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestGlobals;

impl ViewAdapter for RequestGlobals {
    fn set_global(&self, extensions: &mut Extensions, name: &str, value: &str) {
        match extensions.get_mut::<TemplateGlobals>() {
            Some(globals) => globals.insert(name, value),
            None => {
                let mut globals = TemplateGlobals::new();
                globals.insert(name, value);
                extensions.insert(globals);
            }
        }
    }
}

impl<S> FromRequestParts<S> for TemplateGlobals
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<TemplateGlobals>()
            .cloned()
            .unwrap_or_default())
    }
}
