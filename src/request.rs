//! Request descriptor and builder

use crate::body::{Body, Encoding};
use crate::client::Client;
use crate::paging::{PagingCursor, PagingResponse, PagingState};
use crate::progress::ProgressReporter;
use crate::{Error, ResponseState, Result};
use futures_util::Stream;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::Serialize;
use url::Url;

/// An immutable, fully encoded HTTP request.
///
/// A request is built once and never mutated after dispatch; every retry sends a clone.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
    encoding: Encoding,
    progress: Option<ProgressReporter>,
}

impl Request {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
            encoding: Encoding::Query,
            progress: None,
        }
    }

    /// Replace the header set
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set an already encoded body and the strategy that produced it
    pub fn with_body(mut self, body: Body, encoding: Encoding) -> Self {
        self.body = body;
        self.encoding = encoding;
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, including any encoded query string
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Header set sent with the request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Encoded body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Encoding strategy used for the parameters
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub(crate) fn progress(&self) -> Option<&ProgressReporter> {
        self.progress.as_ref()
    }

    pub(crate) fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Copy of this request with the query string encoded from `params`
    pub(crate) fn with_query(&self, params: &impl Serialize) -> Result<Self> {
        let mut request = self.clone();
        append_query(&mut request.url, params)?;
        Ok(request)
    }
}

/// Request builder
pub struct RequestBuilder {
    client: Client,
    method: Method,
    endpoint: String,
    headers: HeaderMap,
    params: Option<serde_json::Value>,
    encoding: Option<Encoding>,
    body: Option<Body>,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            method,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            params: None,
            encoding: None,
            body: None,
        }
    }

    /// Add a header, replacing a default header of the same name
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())?;
        let value = HeaderValue::from_str(value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub(crate) fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in &headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set parameters encoded with the client's default strategy for this method
    pub fn params(mut self, params: impl Serialize) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    /// Set parameters encoded as a query string
    pub fn query(self, params: impl Serialize) -> Result<Self> {
        let mut builder = self.params(params)?;
        builder.encoding = Some(Encoding::Query);
        Ok(builder)
    }

    /// Set parameters encoded as a JSON object body
    pub fn json(self, params: impl Serialize) -> Result<Self> {
        let mut builder = self.params(params)?;
        builder.encoding = Some(Encoding::Json);
        Ok(builder)
    }

    /// Set a raw JSON array body
    pub fn json_array<T: Serialize>(self, items: &[T]) -> Result<Self> {
        let mut builder = self.params(items)?;
        builder.encoding = Some(Encoding::JsonArray);
        Ok(builder)
    }

    /// Set a raw body, bypassing parameter encoding
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Build the request descriptor
    pub fn build(self) -> Result<Request> {
        let options = self.client.options();
        let mut url = self.client.resolve_url(&self.endpoint)?;

        let mut headers = options.headers.clone();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        let encoding = self.encoding.unwrap_or_else(|| {
            if self.method == Method::GET || self.method == Method::DELETE {
                options.query_encoding
            } else {
                options.body_encoding
            }
        });

        let body = match (self.body, self.params) {
            (Some(body), _) => body,
            (None, None) => Body::Empty,
            (None, Some(params)) => encode_params(&mut url, params, encoding)?,
        };

        if let Some(content_type) = body.content_type()
            && !headers.contains_key(CONTENT_TYPE)
        {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        }

        Ok(Request {
            method: self.method,
            url,
            headers,
            body,
            encoding,
            progress: None,
        })
    }

    /// Build and run the request, resolving to a single response state
    pub async fn run<S: ResponseState>(self) -> Result<S> {
        let client = self.client.clone();
        let request = self.build()?;
        client.run(request).await
    }

    /// Build and run the request, yielding offline notices before the terminal state
    pub fn watch<S: ResponseState>(self) -> Result<impl Stream<Item = Result<S>> + Send + 'static> {
        let client = self.client.clone();
        let request = self.build()?;
        Ok(client.watch(request))
    }

    /// Build the request and load it page by page, see [`Client::paginate`]
    pub fn paginate<R, C>(
        self,
        cursor: C,
        signal: crate::LoadMoreSignal,
    ) -> Result<impl Stream<Item = Result<PagingState<R>>> + Send + 'static>
    where
        R: PagingResponse,
        C: PagingCursor,
    {
        let client = self.client.clone();
        let request = self.build()?;
        Ok(client.paginate_request(request, cursor, signal))
    }
}

/// Resolve `endpoint` against an optional base URL.
///
/// Absolute endpoints are used as-is. Without a base URL the endpoint must parse on its own.
pub(crate) fn resolve_url(base: Option<&Url>, endpoint: &str) -> Result<Url> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(Url::parse(endpoint)?);
    }

    match base {
        Some(base) => {
            let joined = format!(
                "{}/{}",
                base.as_str().trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            );
            Ok(Url::parse(&joined)?)
        }
        None => Url::parse(endpoint).map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}"))),
    }
}

fn encode_params(url: &mut Url, params: serde_json::Value, encoding: Encoding) -> Result<Body> {
    match encoding {
        Encoding::Query => {
            match params {
                serde_json::Value::Null => {}
                serde_json::Value::Object(mut fields) => {
                    // Absent optional fields are left out of the query string.
                    fields.retain(|_, value| !value.is_null());
                    append_query(url, &fields)?;
                }
                params => append_query(url, &params)?,
            }
            Ok(Body::Empty)
        }
        Encoding::Json => Ok(Body::Json { value: params }),
        Encoding::JsonArray => {
            if !params.is_array() {
                return Err(Error::InvalidRequest(
                    "JSON array encoding requires an array of parameters".to_string(),
                ));
            }
            Ok(Body::Json { value: params })
        }
    }
}

fn append_query(url: &mut Url, params: &impl Serialize) -> Result<()> {
    let encoded = serde_urlencoded::to_string(params)?;
    if encoded.is_empty() {
        return Ok(());
    }

    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    url.set_query(Some(&query));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relative_endpoint_joins_base() {
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        let url = resolve_url(Some(&base), "/search/repositories").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/search/repositories");
    }

    #[test]
    fn absolute_endpoint_ignores_base() {
        let base = Url::parse("https://api.example.com").unwrap();
        let url = resolve_url(Some(&base), "http://other.test/x").unwrap();
        assert_eq!(url.as_str(), "http://other.test/x");
    }

    #[test]
    fn relative_endpoint_without_base_is_fatal() {
        let err = resolve_url(None, "contacts").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn query_encoding_appends_to_existing_query() {
        let mut url = Url::parse("https://api.example.com/search?sort=stars").unwrap();
        let body = encode_params(&mut url, json!({"q": "rust", "page": 2}), Encoding::Query).unwrap();
        assert!(body.is_empty());
        assert_eq!(url.query(), Some("sort=stars&page=2&q=rust"));
    }

    #[test]
    fn null_fields_are_left_out_of_the_query() {
        let mut url = Url::parse("https://api.example.com/search").unwrap();
        encode_params(&mut url, json!({"q": "rust", "since": null}), Encoding::Query).unwrap();
        assert_eq!(url.query(), Some("q=rust"));

        let mut url = Url::parse("https://api.example.com/search").unwrap();
        encode_params(&mut url, serde_json::Value::Null, Encoding::Query).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn with_query_skips_absent_options() {
        #[derive(Serialize)]
        struct Cursor {
            page: u32,
            since: Option<String>,
        }

        let request = Request::new(Method::GET, Url::parse("https://api.example.com/items").unwrap());
        let first = request.with_query(&Cursor { page: 1, since: None }).unwrap();
        assert_eq!(first.url().query(), Some("page=1"));

        let later = request
            .with_query(&Cursor {
                page: 2,
                since: Some("2024-01-01".into()),
            })
            .unwrap();
        assert_eq!(later.url().query(), Some("page=2&since=2024-01-01"));
    }

    #[test]
    fn json_array_encoding_rejects_objects() {
        let mut url = Url::parse("https://api.example.com/tags").unwrap();
        let err = encode_params(&mut url, json!({"a": 1}), Encoding::JsonArray).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn with_query_leaves_original_untouched() {
        let request = Request::new(Method::GET, Url::parse("https://api.example.com/items").unwrap());
        let paged = request.with_query(&json!({"page": 3})).unwrap();
        assert_eq!(request.url().query(), None);
        assert_eq!(paged.url().query(), Some("page=3"));
    }
}
