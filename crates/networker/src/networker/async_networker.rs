//! The await-style networker.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use super::config::{NetworkerConfig, RetryConfig, RetryPolicy};
use crate::cache::{CacheConfig, CacheKeyPolicy, CachedDownloadLocation, ResponseCache};
use crate::error::{ErrorCase, NetworkError, Result};
use crate::http::{
    DecodedResponse, DownloadedFile, NetworkRequest, RawResponse, ReqwestTransport,
    RequestInterceptor, ResponseHandler, Transport, TransportOutcome, TransportRequest,
    apply_interceptors, build_transport_request,
};
use crate::logger::{LogLevel, NetworkLogger, TracingLogger};
use crate::task::{TaskId, TaskInfo, TaskRegistry};

/// One kind of call: plain data, upload or download.
///
/// The retry, cache and logging skeleton is shared; only dispatching,
/// validation and the cached representation differ.
pub(crate) trait Exchange: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Adjust the built request before it is keyed and intercepted.
    fn prepare(&self, _request: &mut TransportRequest) {}

    fn dispatch(
        &self,
        transport: &dyn Transport,
        request: TransportRequest,
    ) -> BoxFuture<'static, TransportOutcome>;

    fn complete(&self, handler: &ResponseHandler, outcome: TransportOutcome)
    -> Result<Self::Output>;

    fn cached(&self, cache: &ResponseCache, key: &str) -> Option<Self::Output>;

    fn store(&self, cache: &ResponseCache, key: String, output: &Self::Output);
}

pub(crate) struct DataExchange;

impl Exchange for DataExchange {
    type Output = RawResponse;

    fn dispatch(
        &self,
        transport: &dyn Transport,
        request: TransportRequest,
    ) -> BoxFuture<'static, TransportOutcome> {
        transport.send(request)
    }

    fn complete(
        &self,
        handler: &ResponseHandler,
        outcome: TransportOutcome,
    ) -> Result<RawResponse> {
        handler.handle(outcome)
    }

    fn cached(&self, cache: &ResponseCache, key: &str) -> Option<RawResponse> {
        cache.get(key)
    }

    fn store(&self, cache: &ResponseCache, key: String, output: &RawResponse) {
        cache.put(key, output.clone());
    }
}

pub(crate) struct UploadExchange(pub(crate) Bytes);

impl Exchange for UploadExchange {
    type Output = RawResponse;

    fn prepare(&self, request: &mut TransportRequest) {
        request.body = Some(self.0.clone());
    }

    fn dispatch(
        &self,
        transport: &dyn Transport,
        request: TransportRequest,
    ) -> BoxFuture<'static, TransportOutcome> {
        transport.upload(request, self.0.clone())
    }

    fn complete(
        &self,
        handler: &ResponseHandler,
        outcome: TransportOutcome,
    ) -> Result<RawResponse> {
        handler.handle(outcome)
    }

    fn cached(&self, cache: &ResponseCache, key: &str) -> Option<RawResponse> {
        cache.get(key)
    }

    fn store(&self, cache: &ResponseCache, key: String, output: &RawResponse) {
        cache.put(key, output.clone());
    }
}

pub(crate) struct DownloadExchange(pub(crate) PathBuf);

impl Exchange for DownloadExchange {
    type Output = DownloadedFile;

    fn dispatch(
        &self,
        transport: &dyn Transport,
        request: TransportRequest,
    ) -> BoxFuture<'static, TransportOutcome> {
        transport.download(request, self.0.clone())
    }

    fn complete(
        &self,
        handler: &ResponseHandler,
        outcome: TransportOutcome,
    ) -> Result<DownloadedFile> {
        handler.handle_download(outcome, self.0.clone())
    }

    /// A cached download whose file has since disappeared counts as a miss.
    ///
    /// The existence check is a synchronous metadata lookup on the caller's
    /// thread: `prepare` must stay synchronous so callback-style calls can
    /// return their task id immediately.
    fn cached(&self, cache: &ResponseCache, key: &str) -> Option<DownloadedFile> {
        let location = cache.get_download(key)?;
        if !location.destination.exists() {
            cache.invalidate(key);
            return None;
        }
        Some(DownloadedFile {
            destination: location.destination,
            metadata: None,
        })
    }

    fn store(&self, cache: &ResponseCache, key: String, output: &DownloadedFile) {
        let url = output
            .metadata
            .as_ref()
            .map(|metadata| metadata.url.clone())
            .unwrap_or_default();
        cache.put_download(
            key,
            CachedDownloadLocation {
                url,
                destination: output.destination.clone(),
            },
        );
    }
}

/// A call that passed every pre-dispatch check and is registered.
pub(crate) struct PendingCall<E: Exchange> {
    pub(crate) id: TaskId,
    cancel_rx: oneshot::Receiver<()>,
    request: TransportRequest,
    cache_key: Option<String>,
    exchange: E,
    started_at: Instant,
}

/// Result of the synchronous part of a call.
pub(crate) enum Prepared<E: Exchange> {
    /// Finished without dispatching: cache hit, lock or construction error.
    Ready(Result<E::Output>),
    /// Registered and ready to be driven.
    Pending(PendingCall<E>),
}

/// Deregisters a call when dropped, including when the caller drops the
/// call's future before it finishes.
struct Registered<'a> {
    tasks: &'a TaskRegistry,
    id: TaskId,
}

impl Drop for Registered<'_> {
    fn drop(&mut self) {
        self.tasks.complete(self.id);
    }
}

/// Where a single call stands between attempts.
enum CallState {
    /// Attempt number `retries + 1` is about to be sent.
    Dispatched { retries: u32 },
    /// Attempt number `retries + 1` failed; waiting out the retry delay.
    Retrying { retries: u32 },
}

struct Inner {
    transport: Arc<dyn Transport>,
    config: NetworkerConfig,
    cache: ResponseCache,
    tasks: TaskRegistry,
    interceptors: Vec<RequestInterceptor>,
    logger: Arc<dyn NetworkLogger>,
    handler: ResponseHandler,
    locked: AtomicBool,
}

/// Executes requests with caching, retry, interception and cancellation.
///
/// The networker is cheaply cloneable and thread-safe. Clones share the same
/// transport, cache, task registry and lock flag.
///
/// # Example
///
/// ```ignore
/// use networker::{AsyncNetworker, NetworkRequest};
///
/// let networker = AsyncNetworker::builder()
///     .max_retries(2)
///     .enable_cache()
///     .build()?;
///
/// let users = networker
///     .perform_decoded::<Vec<User>>(&NetworkRequest::get("https://api.example.com/users"))
///     .await?
///     .into_value();
/// ```
#[derive(Clone)]
pub struct AsyncNetworker {
    inner: Arc<Inner>,
}

impl AsyncNetworker {
    /// Create a networker with default configuration and a [`ReqwestTransport`].
    pub fn new() -> Result<Self> {
        AsyncNetworkerBuilder::new().build()
    }

    /// Create a builder for configuring a new networker.
    pub fn builder() -> AsyncNetworkerBuilder {
        AsyncNetworkerBuilder::new()
    }

    /// Get the networker's configuration.
    pub fn config(&self) -> &NetworkerConfig {
        &self.inner.config
    }

    /// Perform a request and return the validated raw response.
    pub async fn perform(&self, request: &NetworkRequest) -> Result<RawResponse> {
        self.execute(request, DataExchange).await
    }

    /// Perform a request and decode the JSON body into `T`.
    ///
    /// Only the transport call is retried; a decode failure is final.
    pub async fn perform_decoded<T: DeserializeOwned>(
        &self,
        request: &NetworkRequest,
    ) -> Result<DecodedResponse<T>> {
        let raw = self.perform(request).await?;
        self.decode(raw)
    }

    /// Send `body` as the payload of `request`, replacing any body it carries.
    pub async fn upload(
        &self,
        request: &NetworkRequest,
        body: impl Into<Bytes>,
    ) -> Result<RawResponse> {
        self.execute(request, UploadExchange(body.into())).await
    }

    /// Download the response body of `request` into `destination`.
    ///
    /// With caching enabled, a repeated download is answered with the
    /// location of the earlier file and no metadata.
    pub async fn download(
        &self,
        request: &NetworkRequest,
        destination: impl Into<PathBuf>,
    ) -> Result<DownloadedFile> {
        self.execute(request, DownloadExchange(destination.into())).await
    }

    /// Decode a raw response the same way [`AsyncNetworker::perform_decoded`] does.
    pub fn decode<T: DeserializeOwned>(&self, raw: RawResponse) -> Result<DecodedResponse<T>> {
        self.inner.handler.decode(raw)
    }

    /// Cancel an in-flight call. Returns `false` if it already finished.
    ///
    /// The cancelled call resolves to [`ErrorCase::RequestCanceled`], even
    /// when it was waiting between retries.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.inner.tasks.cancel(id)
    }

    /// Cancel every in-flight call. Returns how many were cancelled.
    pub fn cancel_all_tasks(&self) -> usize {
        self.inner.tasks.cancel_all()
    }

    /// Reject new calls with [`ErrorCase::Locked`] until [`AsyncNetworker::unlock`].
    ///
    /// Calls already in flight are not affected.
    pub fn lock(&self) {
        self.inner.locked.store(true, Ordering::SeqCst);
    }

    /// Accept new calls again.
    pub fn unlock(&self) {
        self.inner.locked.store(false, Ordering::SeqCst);
    }

    /// Whether new calls are currently rejected.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::SeqCst)
    }

    /// Snapshot of the in-flight calls.
    pub fn active_tasks(&self) -> Vec<TaskInfo> {
        self.inner.tasks.snapshot()
    }

    /// Number of in-flight calls.
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// The response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Drop every cached response and download location.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    async fn execute<E: Exchange>(
        &self,
        request: &NetworkRequest,
        exchange: E,
    ) -> Result<E::Output> {
        match self.prepare(request, exchange) {
            Prepared::Ready(result) => result,
            Prepared::Pending(call) => self.finish(call).await,
        }
    }

    /// Everything up to dispatch: lock check, request building, cache
    /// lookup, interceptors and registration.
    pub(crate) fn prepare<E: Exchange>(
        &self,
        request: &NetworkRequest,
        exchange: E,
    ) -> Prepared<E> {
        let inner = &self.inner;

        if self.is_locked() {
            return Prepared::Ready(Err(self.fail(NetworkError::new(ErrorCase::Locked))));
        }

        let mut transport_request = match build_transport_request(request) {
            Ok(transport_request) => transport_request,
            Err(e) => return Prepared::Ready(Err(self.fail(e))),
        };
        exchange.prepare(&mut transport_request);

        let cache_config = &inner.config.cache;
        let cache_key = cache_config.enabled.then(|| {
            cache_config.key_policy.key(
                transport_request.method,
                &transport_request.url,
                transport_request.body.as_deref(),
            )
        });

        if let Some(key) = &cache_key
            && let Some(hit) = exchange.cached(&inner.cache, key)
        {
            inner
                .logger
                .log_message("Cache hit", transport_request.url.as_str());
            return Prepared::Ready(Ok(hit));
        }

        apply_interceptors(&inner.interceptors, &mut transport_request);

        let (id, cancel_rx) = inner.tasks.register(transport_request.url.as_str());
        Prepared::Pending(PendingCall {
            id,
            cancel_rx,
            request: transport_request,
            cache_key,
            exchange,
            started_at: Instant::now(),
        })
    }

    /// Drive a registered call to completion, racing its cancellation signal.
    pub(crate) async fn finish<E: Exchange>(&self, call: PendingCall<E>) -> Result<E::Output> {
        let inner = &self.inner;
        let PendingCall {
            id,
            cancel_rx,
            request,
            cache_key,
            exchange,
            started_at,
        } = call;

        let registered = Registered {
            tasks: &inner.tasks,
            id,
        };

        let method = request.method;
        let url = request.url.to_string();

        let result = tokio::select! {
            biased;
            _ = cancel_rx => Err(NetworkError::new(ErrorCase::RequestCanceled)),
            result = self.drive(&exchange, request) => result,
        };
        drop(registered);

        match result {
            Ok(output) => {
                if let Some(key) = cache_key {
                    exchange.store(&inner.cache, key, &output);
                }
                inner.logger.log_message(
                    "Completed",
                    &format!("{method} {url} in {:?}", started_at.elapsed()),
                );
                Ok(output)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn drive<E: Exchange>(
        &self,
        exchange: &E,
        request: TransportRequest,
    ) -> Result<E::Output> {
        let inner = &self.inner;
        let retry = &inner.config.retry;
        let mut state = CallState::Dispatched { retries: 0 };

        loop {
            state = match state {
                CallState::Dispatched { retries } => {
                    inner.logger.log_request(&request);
                    let outcome = exchange
                        .dispatch(inner.transport.as_ref(), request.clone())
                        .await;
                    let transport_error = outcome.error.clone();

                    match exchange.complete(&inner.handler, outcome) {
                        Ok(output) => return Ok(output),
                        Err(e) if retry.should_retry(retries, &e, transport_error.as_ref()) => {
                            inner
                                .logger
                                .log_retry(&request, retries + 1, retry.delay, &e);
                            CallState::Retrying { retries }
                        }
                        Err(e) => return Err(e),
                    }
                }
                CallState::Retrying { retries } => {
                    tokio::time::sleep(retry.delay).await;
                    CallState::Dispatched {
                        retries: retries + 1,
                    }
                }
            };
        }
    }

    /// Log a terminal failure and hand it back.
    fn fail(&self, error: NetworkError) -> NetworkError {
        self.inner.logger.log_error(&error);
        error
    }
}

impl std::fmt::Debug for AsyncNetworker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncNetworker")
            .field("config", &self.inner.config)
            .field("active_tasks", &self.inner.tasks.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Builder for an [`AsyncNetworker`].
#[derive(Default)]
pub struct AsyncNetworkerBuilder {
    transport: Option<Arc<dyn Transport>>,
    config: NetworkerConfig,
    logger: Option<Arc<dyn NetworkLogger>>,
    interceptors: Vec<RequestInterceptor>,
}

impl AsyncNetworkerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom transport instead of a default [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: NetworkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the maximum number of retries after the first attempt.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    /// Set the fixed delay before each retry.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.delay = delay;
        self
    }

    /// Never retry.
    pub fn no_retry(mut self) -> Self {
        self.config.retry.enabled = false;
        self
    }

    /// Choose which failures are retried.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry.policy = policy;
        self
    }

    /// Replace the cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Turn on the response cache.
    pub fn enable_cache(mut self) -> Self {
        self.config.cache.enabled = true;
        self
    }

    /// Set how long cached entries stay valid.
    pub fn cache_expiration(mut self, expiration: Duration) -> Self {
        self.config.cache.expiration = expiration;
        self
    }

    /// Set the maximum number of cached entries.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    /// Choose how cache keys are derived.
    pub fn cache_key_policy(mut self, policy: CacheKeyPolicy) -> Self {
        self.config.cache.key_policy = policy;
        self
    }

    /// Set the verbosity of the default logger.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Silence the default logger.
    pub fn silent(mut self) -> Self {
        self.config.silent = true;
        self
    }

    /// Use a custom logger. Log level and silence settings are then up to it.
    pub fn logger(mut self, logger: impl NetworkLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Add a request interceptor.
    ///
    /// Interceptors run in the order they were added.
    pub fn add_request_interceptor(mut self, interceptor: RequestInterceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Build the networker.
    pub fn build(self) -> Result<AsyncNetworker> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let logger: Arc<dyn NetworkLogger> = match self.logger {
            Some(logger) => logger,
            None if self.config.silent => Arc::new(TracingLogger::silent()),
            None => Arc::new(TracingLogger::new(self.config.log_level)),
        };

        Ok(AsyncNetworker {
            inner: Arc::new(Inner {
                transport,
                cache: ResponseCache::new(self.config.cache.clone()),
                config: self.config,
                tasks: TaskRegistry::new(),
                interceptors: self.interceptors,
                handler: ResponseHandler::new(logger.clone()),
                logger,
                locked: AtomicBool::new(false),
            }),
        })
    }
}

impl std::fmt::Debug for AsyncNetworkerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncNetworkerBuilder")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
