//! The callback-style networker.
//!
//! [`Networker`] shares the whole execution pipeline with
//! [`AsyncNetworker`]; it only differs in how the caller is resumed. Each call
//! is spawned on a Tokio runtime and its completion closure runs on that
//! runtime once the call finishes.

use std::path::PathBuf;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use super::async_networker::{
    AsyncNetworker, DataExchange, DownloadExchange, Exchange, Prepared, UploadExchange,
};
use crate::error::Result;
use crate::http::{DecodedResponse, DownloadedFile, NetworkRequest, RawResponse};
use crate::task::{TaskId, TaskInfo};

/// A networker that reports results through completion closures.
///
/// # Example
///
/// ```ignore
/// use networker::{AsyncNetworker, NetworkRequest, Networker};
///
/// let networker = Networker::new(AsyncNetworker::new()?);
///
/// let task = networker.perform(&NetworkRequest::get("https://api.example.com/data"), |result| {
///     match result {
///         Ok(response) => println!("Got {}", response.status()),
///         Err(err) => println!("Failed: {}", err),
///     }
/// });
///
/// // Can cancel if needed
/// if let Some(task) = task {
///     networker.cancel_task(task);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Networker {
    networker: AsyncNetworker,
    handle: Handle,
}

impl Networker {
    /// Wrap `networker`, spawning calls on the current runtime or, outside
    /// of one, on the fallback runtime from [`runtime`].
    pub fn new(networker: AsyncNetworker) -> Self {
        Self::with_handle(networker, runtime::handle())
    }

    /// Wrap `networker`, spawning calls on `handle`.
    pub fn with_handle(networker: AsyncNetworker, handle: Handle) -> Self {
        Self { networker, handle }
    }

    /// The await-style networker behind this one.
    pub fn async_networker(&self) -> &AsyncNetworker {
        &self.networker
    }

    /// Start a request; `completion` receives the validated raw response.
    ///
    /// Returns the id of the dispatched call, or `None` when the call
    /// finished without dispatching (cache hit, locked networker, invalid
    /// request). `completion` runs in every case.
    pub fn perform<F>(&self, request: &NetworkRequest, completion: F) -> Option<TaskId>
    where
        F: FnOnce(Result<RawResponse>) + Send + 'static,
    {
        self.start(request, DataExchange, completion)
    }

    /// Start a request; `completion` receives the body decoded as `T`.
    pub fn perform_decoded<T, F>(&self, request: &NetworkRequest, completion: F) -> Option<TaskId>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<DecodedResponse<T>>) + Send + 'static,
    {
        let networker = self.networker.clone();
        self.start(request, DataExchange, move |result: Result<RawResponse>| {
            completion(result.and_then(|raw| networker.decode(raw)));
        })
    }

    /// Start an upload of `body`.
    pub fn upload<F>(
        &self,
        request: &NetworkRequest,
        body: impl Into<Bytes>,
        completion: F,
    ) -> Option<TaskId>
    where
        F: FnOnce(Result<RawResponse>) + Send + 'static,
    {
        self.start(request, UploadExchange(body.into()), completion)
    }

    /// Start a download into `destination`.
    pub fn download<F>(
        &self,
        request: &NetworkRequest,
        destination: impl Into<PathBuf>,
        completion: F,
    ) -> Option<TaskId>
    where
        F: FnOnce(Result<DownloadedFile>) + Send + 'static,
    {
        self.start(request, DownloadExchange(destination.into()), completion)
    }

    /// Cancel an in-flight call. Its completion receives `RequestCanceled`.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.networker.cancel_task(id)
    }

    /// Cancel every in-flight call.
    pub fn cancel_all_tasks(&self) -> usize {
        self.networker.cancel_all_tasks()
    }

    /// Reject new calls until [`Networker::unlock`].
    pub fn lock(&self) {
        self.networker.lock();
    }

    /// Accept new calls again.
    pub fn unlock(&self) {
        self.networker.unlock();
    }

    /// Whether new calls are currently rejected.
    pub fn is_locked(&self) -> bool {
        self.networker.is_locked()
    }

    /// Snapshot of the in-flight calls.
    pub fn active_tasks(&self) -> Vec<TaskInfo> {
        self.networker.active_tasks()
    }

    fn start<E, F>(&self, request: &NetworkRequest, exchange: E, completion: F) -> Option<TaskId>
    where
        E: Exchange,
        F: FnOnce(Result<E::Output>) + Send + 'static,
    {
        match self.networker.prepare(request, exchange) {
            Prepared::Ready(result) => {
                self.handle.spawn(async move { completion(result) });
                None
            }
            Prepared::Pending(call) => {
                let id = call.id;
                let networker = self.networker.clone();
                self.handle.spawn(async move {
                    let result = networker.finish(call).await;
                    completion(result);
                });
                Some(id)
            }
        }
    }
}

/// Runtime management for callback-style calls.
///
/// Calls made from inside a Tokio runtime are spawned on it. Outside of one,
/// a small shared runtime is created on first use.
pub mod runtime {
    use std::sync::OnceLock;
    use tokio::runtime::{Handle, Runtime};

    static RUNTIME: OnceLock<Runtime> = OnceLock::new();

    /// Initialize the fallback runtime.
    ///
    /// If not called explicitly, the runtime is created on first use.
    pub fn init() -> &'static Runtime {
        RUNTIME.get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("networker")
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime")
        })
    }

    /// Handle of the current runtime, or of the fallback runtime when the
    /// caller is not inside one.
    pub fn handle() -> Handle {
        Handle::try_current().unwrap_or_else(|_| init().handle().clone())
    }

    /// Block on a future using the fallback runtime.
    ///
    /// # Warning
    ///
    /// Do not call this from within an async context, as it will panic.
    pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
        init().block_on(future)
    }
}
