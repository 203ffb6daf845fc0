//! HTTP response types.

use std::path::PathBuf;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{DecodingFailure, ErrorCase, NetworkError, Result};
use crate::status;

/// Transport-level metadata of a response: status line, headers and final URL.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseMetadata {
    /// The HTTP status code.
    pub status: u16,
    /// The response headers.
    pub headers: http::HeaderMap,
    /// The final URL after redirects.
    pub url: String,
}

impl ResponseMetadata {
    /// Create metadata with no headers.
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            headers: http::HeaderMap::new(),
            url: url.into(),
        }
    }

    /// Create from a reqwest response.
    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            url: response.url().to_string(),
        }
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Check if the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        status::is_successful(self.status)
    }
}

/// A completed response: raw body bytes plus transport metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    body: Bytes,
    metadata: ResponseMetadata,
}

impl RawResponse {
    /// Pair a body with its metadata.
    pub fn new(body: impl Into<Bytes>, metadata: ResponseMetadata) -> Self {
        Self {
            body: body.into(),
            metadata,
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.metadata.status
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        self.metadata.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.metadata.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.metadata.header(name)
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the final URL after redirects.
    pub fn url(&self) -> &str {
        &self.metadata.url
    }

    /// The transport metadata.
    pub fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }

    /// The raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON without classification or logging.
    ///
    /// Prefer the networker's decode path, which classifies and logs failures.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            NetworkError::new(ErrorCase::DecodingError(DecodingFailure::from(&e).message()))
        })
    }

    /// Split into body and metadata.
    pub fn into_parts(self) -> (Bytes, ResponseMetadata) {
        (self.body, self.metadata)
    }
}

/// A raw response together with the value decoded from its body.
///
/// Only constructed after a successful decode.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedResponse<T> {
    raw: RawResponse,
    value: T,
}

impl<T> DecodedResponse<T> {
    pub(crate) fn new(raw: RawResponse, value: T) -> Self {
        Self { raw, value }
    }

    /// The response the value was decoded from.
    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// The decoded value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take the decoded value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Split into raw response and value.
    pub fn into_parts(self) -> (RawResponse, T) {
        (self.raw, self.value)
    }
}

/// Result of a download: where the file is and, for a fresh transfer, the
/// response metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadedFile {
    /// Location of the downloaded file.
    pub destination: PathBuf,
    /// Metadata of the response; `None` when served from the cache.
    pub metadata: Option<ResponseMetadata>,
}

impl DownloadedFile {
    /// Whether this result came from the cache instead of a transfer.
    pub fn is_cached(&self) -> bool {
        self.metadata.is_none()
    }
}
