//! Execution orchestrators.
//!
//! [`AsyncNetworker`] resolves each call as a future; [`Networker`] spawns
//! each call and reports through a completion closure. Both run the same
//! pipeline:
//!
//! 1. reject the call if the networker is locked
//! 2. build the transport request
//! 3. answer from the cache when enabled and fresh
//! 4. run the request interceptors and register the call
//! 5. dispatch, retrying with a fixed delay while the retry policy allows
//! 6. cache the success or log the terminal failure

mod async_networker;
mod callback;
mod config;

pub use async_networker::{AsyncNetworker, AsyncNetworkerBuilder};
pub use callback::{Networker, runtime};
pub use config::{NetworkerConfig, RetryConfig, RetryPolicy};
