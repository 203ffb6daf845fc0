//! Request value objects and the transport request builder.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{ErrorCase, NetworkError, Result};

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(NetworkError::new(ErrorCase::Unknown {
                status: None,
                message: format!("Unsupported HTTP method '{other}'."),
            })),
        }
    }
}

/// The body of a [`NetworkRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Plain text body.
    Text(String),
    /// JSON body (already converted from a serializable value).
    Json(serde_json::Value),
    /// URL-encoded form data.
    Form(HashMap<String, String>),
    /// Raw binary body.
    Bytes(Bytes),
}

impl RequestBody {
    /// Encode the body into bytes, or `None` when there is no body.
    pub fn encode(&self) -> Result<Option<Bytes>> {
        match self {
            Self::None => Ok(None),
            Self::Text(text) => Ok(Some(Bytes::from(text.clone()))),
            Self::Json(value) => serde_json::to_vec(value)
                .map(|encoded| Some(Bytes::from(encoded)))
                .map_err(|e| NetworkError::new(ErrorCase::EncodingError(e.to_string()))),
            Self::Form(data) => {
                let mut pairs: Vec<_> = data.iter().collect();
                pairs.sort();
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                Ok(Some(Bytes::from(encoded)))
            }
            Self::Bytes(bytes) => Ok(Some(bytes.clone())),
        }
    }

    /// Content type implied by the body kind.
    fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::None | Self::Bytes(_) => None,
            Self::Text(_) => Some("text/plain; charset=utf-8"),
            Self::Json(_) => Some("application/json"),
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
        }
    }
}

/// An application-level request: what to call, not how.
///
/// Values are built with the chaining methods below and handed to a
/// networker, which turns them into a [`TransportRequest`].
///
/// # Example
///
/// ```ignore
/// let request = NetworkRequest::post("https://api.example.com/users")
///     .header("Accept", "application/json")
///     .json(&CreateUser { name: "John" })?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The target URL.
    pub url: String,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Request timeout override.
    pub timeout: Option<Duration>,
}

impl NetworkRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: http::HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::None,
            timeout: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Create a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    /// Create a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Create a PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    /// Add a header. Invalid names or values are dropped with a warning.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                tracing::warn!(
                    target: "networker::request",
                    "Ignoring invalid header on {}",
                    self.url
                );
            }
        }
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a plain text body.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    /// Set a raw binary body.
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    /// Set a URL-encoded form body.
    pub fn form(mut self, data: HashMap<String, String>) -> Self {
        self.body = RequestBody::Form(data);
        self
    }

    /// Set a JSON body from a serializable value.
    ///
    /// Fails with [`ErrorCase::EncodingError`] when the value cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| NetworkError::new(ErrorCase::EncodingError(e.to_string())))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Set a timeout for this specific request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A request ready to be handed to a transport.
///
/// Produced by [`build_transport_request`] and then mutated in place by the
/// request interceptors.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Absolute URL, query parameters included.
    pub url: url::Url,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Encoded body.
    pub body: Option<Bytes>,
    /// Request timeout override.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Create a bare request for a parsed URL.
    pub fn new(method: HttpMethod, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: http::HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Get a header value as a string.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }
}

/// Turn a [`NetworkRequest`] into a [`TransportRequest`].
///
/// Fails with [`ErrorCase::InvalidUrl`] when the URL is empty or does not
/// parse to an absolute network locator, and with
/// [`ErrorCase::EncodingError`] when the body cannot be encoded. A content
/// type matching the body kind is added unless one is already set.
pub fn build_transport_request(request: &NetworkRequest) -> Result<TransportRequest> {
    let mut url = parse_url(&request.url)?;
    if !request.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &request.query {
            pairs.append_pair(key, value);
        }
    }

    let mut headers = request.headers.clone();
    if let Some(content_type) = request.body.content_type()
        && !headers.contains_key(http::header::CONTENT_TYPE)
    {
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(content_type),
        );
    }

    Ok(TransportRequest {
        method: request.method,
        url,
        headers,
        body: request.body.encode()?,
        timeout: request.timeout,
    })
}

fn parse_url(raw: &str) -> Result<url::Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NetworkError::new(ErrorCase::InvalidUrl(
            "The URL is empty.".to_string(),
        )));
    }
    let url = url::Url::parse(trimmed)
        .map_err(|e| NetworkError::new(ErrorCase::InvalidUrl(format!("{trimmed}: {e}"))))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(NetworkError::new(ErrorCase::InvalidUrl(format!(
            "{trimmed} is not a network URL."
        ))));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_post_with_json_body() {
        let value = json!({"name": "test", "value": 42});
        let request = NetworkRequest::post("https://example.com/api")
            .header("Content-Type", "application/json")
            .json(&value)
            .unwrap();

        let built = build_transport_request(&request).unwrap();
        assert_eq!(built.method.as_str(), "POST");
        assert_eq!(built.url.as_str(), "https://example.com/api");
        assert_eq!(built.header("content-type"), Some("application/json"));
        assert_eq!(built.body.unwrap(), Bytes::from(serde_json::to_vec(&value).unwrap()));
    }

    #[test]
    fn test_build_appends_query() {
        let request = NetworkRequest::get("https://example.com/items")
            .query("page", "1")
            .query("q", "a b");
        let built = build_transport_request(&request).unwrap();
        assert_eq!(built.url.as_str(), "https://example.com/items?page=1&q=a+b");
        assert!(built.body.is_none());
    }

    #[test]
    fn test_build_rejects_bad_urls() {
        for url in ["", "   ", "not a url", "mailto:someone@example.com"] {
            let err = build_transport_request(&NetworkRequest::get(url)).unwrap_err();
            assert!(
                matches!(err.case(), ErrorCase::InvalidUrl(_)),
                "{url:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_json_encoding_failure_is_an_error() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], "non-string key");
        let err = NetworkRequest::post("https://example.com").json(&map).unwrap_err();
        assert!(matches!(err.case(), ErrorCase::EncodingError(_)));
    }

    #[test]
    fn test_form_body_and_content_type() {
        let mut form = HashMap::new();
        form.insert("b".to_string(), "2".to_string());
        form.insert("a".to_string(), "1 2".to_string());
        let built =
            build_transport_request(&NetworkRequest::post("https://example.com").form(form))
                .unwrap();
        assert_eq!(built.body.clone().unwrap(), Bytes::from("a=1+2&b=2"));
        assert_eq!(
            built.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_method_round_trip_through_str() {
        for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Patch] {
            assert_eq!(method.as_str().parse::<HttpMethod>().unwrap(), method);
        }
        assert!("BREW".parse::<HttpMethod>().is_err());
    }
}
