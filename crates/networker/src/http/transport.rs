//! The transport collaborator.
//!
//! A [`Transport`] moves bytes; it never classifies, retries, caches or logs.
//! Every call resolves to a [`TransportOutcome`] holding whatever the wire
//! produced. Dropping the returned future cancels the call, which is how the
//! networker aborts an in-flight request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;
use tokio::io::AsyncWriteExt;

use super::request::TransportRequest;
use super::response::ResponseMetadata;
use crate::error::{ErrorCase, NetworkError, Result, TransportError};
use crate::status;

/// What a single transport call produced.
///
/// Any combination of fields may be present: a body with metadata for a
/// normal response, only an error for a connection failure, metadata with an
/// error when reading the body failed halfway.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransportOutcome {
    /// The response body.
    pub body: Option<Bytes>,
    /// Status line, headers and final URL.
    pub metadata: Option<ResponseMetadata>,
    /// The low-level failure, if any.
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    /// A response that arrived completely.
    pub fn completed(body: impl Into<Bytes>, metadata: ResponseMetadata) -> Self {
        Self {
            body: Some(body.into()),
            metadata: Some(metadata),
            error: None,
        }
    }

    /// A call that failed before any response arrived.
    pub fn failed(error: TransportError) -> Self {
        Self {
            body: None,
            metadata: None,
            error: Some(error),
        }
    }

    /// Whether metadata with a 2xx status is present and no error occurred.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self
                .metadata
                .as_ref()
                .is_some_and(|metadata| status::is_successful(metadata.status))
    }
}

/// Sends transport requests.
///
/// Implementations must be cancel-safe: the networker drops the future to
/// cancel a call, and a dropped call must not leave partial state behind
/// that a later call could observe.
pub trait Transport: Send + Sync + 'static {
    /// Send a request and collect the full response body.
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, TransportOutcome>;

    /// Send a request with `body` as its payload.
    fn upload(
        &self,
        mut request: TransportRequest,
        body: Bytes,
    ) -> BoxFuture<'static, TransportOutcome> {
        request.body = Some(body);
        self.send(request)
    }

    /// Send a request and write a successful response body to `destination`.
    ///
    /// On success the outcome carries the metadata and no body. For a non-2xx
    /// response nothing is written and the body is returned for classification.
    fn download(
        &self,
        request: TransportRequest,
        destination: PathBuf,
    ) -> BoxFuture<'static, TransportOutcome> {
        let sending = self.send(request);
        Box::pin(async move {
            let mut outcome = sending.await;
            if outcome.is_success() {
                let body = outcome.body.take().unwrap_or_default();
                if let Err(e) = tokio::fs::write(&destination, &body).await {
                    outcome.error = Some(e.into());
                }
            }
            outcome
        })
    }
}

/// Configuration for [`ReqwestTransport`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            cookies_enabled: true,
            user_agent: Some(format!("networker/{} (Rust)", env!("CARGO_PKG_VERSION"))),
            proxy: None,
        }
    }
}

/// Builder for a [`ReqwestTransport`] with custom configuration.
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    config: TransportConfig,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    ///
    /// 3xx responses are then classified as redirection errors.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Disable cookie storage.
    pub fn no_cookies(mut self) -> Self {
        self.config.cookies_enabled = false;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if self.config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                NetworkError::new(ErrorCase::InvalidUrl(format!("proxy {proxy_url}: {e}")))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::new(ErrorCase::Network(TransportError::from(e))))?;

        Ok(ReqwestTransport {
            inner: Arc::new(ReqwestTransportInner {
                client,
                config: self.config,
            }),
        })
    }
}

struct ReqwestTransportInner {
    client: reqwest::Client,
    config: TransportConfig,
}

/// [`Transport`] backed by a shared `reqwest` client.
///
/// The transport is cheaply cloneable and thread-safe. Clones share the same
/// underlying connection pool and configuration.
///
/// # Example
///
/// ```ignore
/// use networker::http::ReqwestTransport;
///
/// let transport = ReqwestTransport::builder()
///     .timeout(Duration::from_secs(60))
///     .user_agent("MyApp/1.0")
///     .no_cookies()
///     .build()?;
/// ```
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: Arc<ReqwestTransportInner>,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        ReqwestTransportBuilder::new().build()
    }

    /// Create a builder for configuring a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Get the transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    fn prepare(client: &reqwest::Client, request: TransportRequest) -> reqwest::RequestBuilder {
        let mut req_builder = client
            .request(request.method.to_reqwest(), request.url)
            .headers(request.headers);

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }
        req_builder
    }

    async fn execute(client: reqwest::Client, request: TransportRequest) -> TransportOutcome {
        let response = match Self::prepare(&client, request).send().await {
            Ok(response) => response,
            Err(e) => return TransportOutcome::failed(e.into()),
        };
        let metadata = ResponseMetadata::from_reqwest(&response);
        match response.bytes().await {
            Ok(body) => TransportOutcome::completed(body, metadata),
            Err(e) => TransportOutcome {
                body: None,
                metadata: Some(metadata),
                error: Some(e.into()),
            },
        }
    }

    async fn execute_download(
        client: reqwest::Client,
        request: TransportRequest,
        destination: PathBuf,
    ) -> TransportOutcome {
        let mut response = match Self::prepare(&client, request).send().await {
            Ok(response) => response,
            Err(e) => return TransportOutcome::failed(e.into()),
        };
        let metadata = ResponseMetadata::from_reqwest(&response);

        if !metadata.is_success() {
            let body = response.bytes().await.ok();
            return TransportOutcome {
                body,
                metadata: Some(metadata),
                error: None,
            };
        }

        let written = async {
            let mut file = tokio::fs::File::create(&destination).await?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<(), TransportError>(())
        }
        .await;

        TransportOutcome {
            body: None,
            metadata: Some(metadata),
            error: written.err(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, TransportOutcome> {
        Box::pin(Self::execute(self.inner.client.clone(), request))
    }

    fn download(
        &self,
        request: TransportRequest,
        destination: PathBuf,
    ) -> BoxFuture<'static, TransportOutcome> {
        Box::pin(Self::execute_download(
            self.inner.client.clone(),
            request,
            destination,
        ))
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_requires_2xx_and_no_error() {
        let ok = TransportOutcome::completed("x", ResponseMetadata::new(204, "https://a.test"));
        assert!(ok.is_success());

        let not_found =
            TransportOutcome::completed("x", ResponseMetadata::new(404, "https://a.test"));
        assert!(!not_found.is_success());

        let mut broken = ok.clone();
        broken.error = Some(TransportError::Other("reset".into()));
        assert!(!broken.is_success());

        assert!(!TransportOutcome::failed(TransportError::Timeout).is_success());
    }

    #[test]
    fn test_builder_applies_settings() {
        let transport = ReqwestTransport::builder()
            .timeout(Duration::from_secs(5))
            .no_redirects()
            .no_cookies()
            .user_agent("test-agent")
            .build()
            .unwrap();
        let config = transport.config();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(!config.follow_redirects);
        assert!(!config.cookies_enabled);
        assert_eq!(config.user_agent.as_deref(), Some("test-agent"));
    }
}
