//! Reading the submitted token from a request.

use axum::body::{Body, Bytes};
use http::{header::CONTENT_TYPE, HeaderMap, Request};
use serde_json::{Map, Value};

/// Request body parsed into a key/value mapping.
///
/// Form fields are strings; a form field sent more than once becomes an array.
pub type ParsedBody = Map<String, Value>;

/// What the client sent in the token field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedToken {
    /// Field absent or empty
    Missing,
    /// Field present but not a single string
    NonString,
    /// Field present
    Value(String),
}

impl SubmittedToken {
    /// Look up `field` in a parsed body.
    #[must_use]
    pub fn from_body(body: &ParsedBody, field: &str) -> Self {
        match body.get(field) {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::String(s)) if s.is_empty() => Self::Missing,
            Some(Value::String(s)) => Self::Value(s.clone()),
            Some(_) => Self::NonString,
        }
    }

    /// Look up a token sent in a request header.
    #[must_use]
    pub fn from_header(headers: &HeaderMap, name: &str) -> Self {
        match headers.get(name).map(|v| v.to_str()) {
            None => Self::Missing,
            Some(Ok("")) => Self::Missing,
            Some(Ok(value)) => Self::Value(value.to_string()),
            Some(Err(_)) => Self::NonString,
        }
    }

    /// Whether nothing was submitted.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Form,
    Json,
}

fn body_format(headers: &HeaderMap) -> Option<BodyFormat> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();

    if essence == "application/x-www-form-urlencoded" {
        Some(BodyFormat::Form)
    } else if essence == "application/json" || essence.ends_with("+json") {
        Some(BodyFormat::Json)
    } else {
        None
    }
}

/// Buffer and parse the request body, returning the request with its body restored.
///
/// Bodies in a format that cannot carry the token are left untouched and parse
/// as an empty mapping.
///
/// # Errors
///
/// Fails when the body exceeds `limit` or the stream breaks. The body has been
/// consumed by then, so the request is dropped with it.
pub(crate) async fn parse_request(
    request: Request<Body>,
    limit: usize,
) -> Result<(Request<Body>, ParsedBody), axum::Error> {
    let Some(format) = body_format(request.headers()) else {
        return Ok((request, ParsedBody::new()));
    };

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await?;
    let parsed = match format {
        BodyFormat::Form => parse_form(&bytes),
        BodyFormat::Json => parse_json(&bytes),
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), parsed))
}

fn parse_form(bytes: &Bytes) -> ParsedBody {
    let pairs = match serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) {
        Ok(pairs) => pairs,
        Err(err) => {
            tracing::debug!(error = %err, "Malformed form body");
            return ParsedBody::new();
        }
    };

    let mut body = ParsedBody::new();
    for (key, value) in pairs {
        match body.get_mut(&key) {
            None => {
                body.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    body
}

fn parse_json(bytes: &Bytes) -> ParsedBody {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => ParsedBody::new(),
        Err(err) => {
            tracing::debug!(error = %err, "Malformed JSON body");
            ParsedBody::new()
        }
    }
}
