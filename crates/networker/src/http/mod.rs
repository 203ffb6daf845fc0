//! HTTP value objects and the collaborators around a call.
//!
//! - [`NetworkRequest`] is what callers build; [`build_transport_request`]
//!   turns it into a [`TransportRequest`].
//! - [`RequestInterceptor`]s mutate the transport request before dispatch.
//! - A [`Transport`] sends it; [`ReqwestTransport`] is the default.
//! - [`ResponseHandler`] turns the [`TransportOutcome`] into a
//!   [`RawResponse`] or a classified error, and decodes JSON payloads.
//!
//! # Example
//!
//! ```ignore
//! use networker::http::{NetworkRequest, ReqwestTransport, Transport, build_transport_request};
//!
//! let transport = ReqwestTransport::new()?;
//! let request = NetworkRequest::get("https://api.example.com/users").query("page", "2");
//! let outcome = transport.send(build_transport_request(&request)?).await;
//! ```

mod handler;
pub mod interceptor;
mod request;
mod response;
mod transport;

pub use handler::ResponseHandler;
pub use interceptor::{RequestInterceptor, apply_interceptors};
pub use request::{
    HttpMethod, NetworkRequest, RequestBody, TransportRequest, build_transport_request,
};
pub use response::{DecodedResponse, DownloadedFile, RawResponse, ResponseMetadata};
pub use transport::{
    ReqwestTransport, ReqwestTransportBuilder, Transport, TransportConfig, TransportOutcome,
};
