//! Request body types and parameter encoding strategies

use bytes::Bytes;
use serde::Serialize;

/// How request parameters are placed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Parameters are appended to the URL as a query string
    #[default]
    Query,
    /// Parameters are sent as a JSON object body
    Json,
    /// Parameters are sent as a raw JSON array body
    JsonArray,
}

/// Request body types
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// Empty body
    #[default]
    Empty,

    /// Raw bytes with content type
    Bytes {
        /// The content
        content: Bytes,
        /// Content type
        content_type: String,
    },

    /// JSON data, object or array
    Json {
        /// JSON value
        value: serde_json::Value,
    },
}

impl Body {
    /// Create an empty body
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a body from bytes
    pub fn bytes(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self::Bytes {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Create a body from text
    pub fn text(content: impl Into<String>) -> Self {
        Self::Bytes {
            content: content.into().into(),
            content_type: "text/plain; charset=utf-8".to_string(),
        }
    }

    /// Create a JSON body
    pub fn json(value: impl Serialize) -> Result<Self, crate::Error> {
        Ok(Self::Json {
            value: serde_json::to_value(value)?,
        })
    }

    /// Whether there is nothing to send
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Content type implied by the body, if any
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Body::Empty => None,
            Body::Bytes { content_type, .. } => Some(content_type),
            Body::Json { .. } => Some("application/json"),
        }
    }

    /// Serialize the body into the bytes sent on the wire
    pub fn to_bytes(&self) -> Result<Bytes, crate::Error> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes { content, .. } => Ok(content.clone()),
            Body::Json { value } => Ok(serde_json::to_vec(value)?.into()),
        }
    }
}

impl From<String> for Body {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}

impl From<&str> for Body {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<Vec<u8>> for Body {
    fn from(content: Vec<u8>) -> Self {
        Self::bytes(content, "application/octet-stream")
    }
}

impl From<Bytes> for Body {
    fn from(content: Bytes) -> Self {
        Self::bytes(content, "application/octet-stream")
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_body_carries_plain_content_type() {
        let body = Body::text("Hello, World!");
        assert_eq!(body.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(body.to_bytes().unwrap().as_ref(), b"Hello, World!");
    }

    #[test]
    fn json_array_body_serializes_as_array() {
        let body = Body::from(json!(["a", "b"]));
        assert_eq!(body.content_type(), Some("application/json"));
        assert_eq!(body.to_bytes().unwrap().as_ref(), br#"["a","b"]"#);
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let body = Body::default();
        assert!(body.is_empty());
        assert_eq!(body.content_type(), None);
        assert!(body.to_bytes().unwrap().is_empty());
    }
}
