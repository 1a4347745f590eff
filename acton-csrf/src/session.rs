//! Session collaborator.
//!
//! The CSRF middleware never creates or destroys sessions. It looks up a
//! [`SessionBackend`] in the request extensions and reads and writes a single
//! key in it. [`tower_sessions::Session`], inserted by
//! [`SessionManagerLayer`], is the default backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_csrf::session::{create_memory_session_layer, SessionConfig};
//!
//! let app = Router::new()
//!     .route("/", get(index))
//!     .layer(csrf_stack)
//!     .layer(create_memory_session_layer(&SessionConfig::default()));
//! ```

use async_trait::async_trait;

use crate::error::Result;

pub use crate::config::SessionConfig;

// Re-export tower-sessions types for convenience
pub use tower_sessions::{Expiry, Session, SessionManagerLayer};

#[cfg(feature = "session-memory")]
pub use tower_sessions_memory_store::MemoryStore;

/// Key/value session storage as seen by the CSRF middleware.
///
/// Implementations must be cheap to clone: the middleware clones the handle
/// out of the request extensions.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Whether the session has been started for this request.
    fn is_active(&self) -> bool;

    /// Read a string value. Missing keys and non-string values read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a string value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[async_trait]
impl SessionBackend for Session {
    fn is_active(&self) -> bool {
        // A handle in the extensions means `SessionManagerLayer` ran for this request.
        true
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.get_value(key).await?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value).await?;
        Ok(())
    }
}

/// Create a `SessionManagerLayer` backed by an in-memory store.
///
/// Sessions do not survive a restart and are not shared between processes;
/// use it for development and tests.
#[cfg(feature = "session-memory")]
pub fn create_memory_session_layer(config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    use time::Duration;
    use tower_sessions::cookie::SameSite;

    let expiry = if config.expiry_secs == 0 {
        Expiry::OnSessionEnd
    } else {
        Expiry::OnInactivity(Duration::seconds(config.expiry_secs as i64))
    };

    let same_site = match config.same_site.to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    };

    let mut layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(config.cookie_name.clone())
        .with_expiry(expiry)
        .with_secure(config.secure)
        .with_http_only(config.http_only)
        .with_same_site(same_site)
        .with_path(config.cookie_path.clone());

    if let Some(domain) = config.cookie_domain.clone() {
        layer = layer.with_domain(domain);
    }

    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions_memory_store::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let session = session();
        assert!(session.is_active());
        assert_eq!(SessionBackend::get(&session, "csrf_token").await.unwrap(), None);

        SessionBackend::set(&session, "csrf_token", "abc").await.unwrap();
        assert_eq!(
            SessionBackend::get(&session, "csrf_token").await.unwrap(),
            Some("abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_string_value_reads_as_none() {
        let session = session();
        session.insert("csrf_token", 42).await.unwrap();
        assert_eq!(SessionBackend::get(&session, "csrf_token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = session();
        let handle = session.clone();
        SessionBackend::set(&handle, "csrf_token", "shared").await.unwrap();
        assert_eq!(
            SessionBackend::get(&session, "csrf_token").await.unwrap(),
            Some("shared".to_string())
        );
    }
}
