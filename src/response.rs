//! Response handling

use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A completed HTTP exchange as seen by response-state constructors.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    /// Create a raw response from its parts
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Get the response status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get all headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Borrow the body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response and return the body
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Decode the body as UTF-8 text
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(Error::from)
    }

    /// Parse the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Repo {
        id: u64,
    }

    #[test]
    fn json_and_text_read_the_same_body() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        let response = RawResponse::new(StatusCode::OK, headers, r#"{"id":7}"#);

        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.text().unwrap(), r#"{"id":7}"#);
        assert_eq!(response.json::<Repo>().unwrap().id, 7);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let response = RawResponse::new(StatusCode::OK, HeaderMap::new(), vec![0xff, 0xfe]);
        assert!(matches!(response.text(), Err(Error::Utf8(_))));
    }
}
