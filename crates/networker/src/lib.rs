//! Client-side HTTP orchestration.
//!
//! This crate turns request values into validated responses:
//!
//! - **Requests**: [`NetworkRequest`] values with headers, query parameters
//!   and text, JSON, form or binary bodies
//! - **Classification**: every failure becomes one [`NetworkError`] carrying
//!   an [`ErrorCase`] and the message the API returned, if any
//! - **Retry**: a fixed delay between attempts, limited by a retry policy
//! - **Caching**: an optional time-expiring response cache
//! - **Control**: cancellable in-flight calls and a lock that pauses new traffic
//!
//! # Making Requests
//!
//! ```ignore
//! use networker::{AsyncNetworker, NetworkRequest};
//!
//! let networker = AsyncNetworker::builder()
//!     .max_retries(2)
//!     .retry_delay(Duration::from_millis(500))
//!     .build()?;
//!
//! // Raw response
//! let response = networker
//!     .perform(&NetworkRequest::get("https://api.example.com/data"))
//!     .await?;
//! println!("Status: {}", response.status());
//!
//! // Decoded JSON
//! let user: User = networker
//!     .perform_decoded(&NetworkRequest::get("https://api.example.com/users/1"))
//!     .await?
//!     .into_value();
//! ```
//!
//! ## Request Bodies
//!
//! ```ignore
//! // JSON body
//! let request = NetworkRequest::post("https://api.example.com/users")
//!     .json(&serde_json::json!({"name": "John"}))?;
//!
//! // Form data
//! let mut form = HashMap::new();
//! form.insert("username".to_string(), "john".to_string());
//! let request = NetworkRequest::post("https://example.com/login").form(form);
//! ```
//!
//! ## Errors
//!
//! ```ignore
//! match networker.perform(&request).await {
//!     Ok(response) => println!("{}", response.text()),
//!     Err(err) => match err.case() {
//!         ErrorCase::NotFound(_) => println!("missing"),
//!         _ => println!("{}", err.detailed_description()),
//!     },
//! }
//! ```
//!
//! ## Interceptors
//!
//! ```ignore
//! use networker::http::interceptor;
//!
//! let networker = AsyncNetworker::builder()
//!     .add_request_interceptor(interceptor::bearer_auth("token"))
//!     .add_request_interceptor(interceptor::default_header("Accept", "application/json"))
//!     .build()?;
//! ```
//!
//! # Callback Style
//!
//! [`Networker`] runs the same pipeline and reports through closures:
//!
//! ```ignore
//! let networker = Networker::new(AsyncNetworker::new()?);
//! let task = networker.perform(&request, |result| {
//!     if let Ok(response) = result {
//!         println!("Got response: {}", response.status());
//!     }
//! });
//! ```
//!
//! # Logging
//!
//! Events are reported through [`NetworkLogger`]. The default
//! [`TracingLogger`] emits `tracing` events under the `networker::*` targets;
//! install a subscriber to see them.

pub mod cache;
pub mod classify;
mod error;
pub mod http;
pub mod logger;
mod networker;
pub mod status;
pub mod task;

pub use error::{
    DecodingFailure, ErrorCase, Failure, NetworkError, Result, TransportError,
    BAD_REQUEST_DESCRIPTION, FORBIDDEN_DESCRIPTION, NOT_FOUND_DESCRIPTION,
    UNAUTHORIZED_DESCRIPTION, UNKNOWN_ERROR_DESCRIPTION,
};

// Re-export commonly used types at the crate root
pub use cache::{CacheConfig, CacheKeyPolicy, CacheStats, ResponseCache};
pub use http::{
    DecodedResponse, DownloadedFile, HttpMethod, NetworkRequest, RawResponse, RequestBody,
    RequestInterceptor, ReqwestTransport, ResponseMetadata, Transport, TransportOutcome,
    TransportRequest,
};
pub use logger::{LogLevel, NetworkLogger, TracingLogger};
pub use networker::{
    AsyncNetworker, AsyncNetworkerBuilder, Networker, NetworkerConfig, RetryConfig, RetryPolicy,
    runtime,
};
pub use task::{TaskId, TaskInfo};
