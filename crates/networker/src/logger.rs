//! Request/response tracing.
//!
//! The networker reports through the [`NetworkLogger`] trait. The default
//! [`TracingLogger`] forwards to `tracing` and is gated by a [`LogLevel`]
//! and a silence flag; installing a subscriber is up to the application.

use std::time::Duration;

use crate::error::NetworkError;
use crate::http::{RawResponse, TransportRequest};

/// Maximum number of characters of a body included in debug output.
const BODY_SNIPPET_LIMIT: usize = 1024;

/// Verbosity of a [`TracingLogger`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Only terminal errors.
    Error,
    /// Errors plus one line per request and response.
    #[default]
    Info,
    /// Everything, including headers and body snippets.
    Debug,
}

/// Side-effecting sink for networker events.
///
/// Every method is fire-and-forget.
pub trait NetworkLogger: Send + Sync {
    /// An outgoing request, after interceptors ran.
    fn log_request(&self, request: &TransportRequest);

    /// A successful response.
    fn log_response(&self, response: &RawResponse);

    /// A free-form event, e.g. a cache hit or the elapsed time of a call.
    fn log_message(&self, title: &str, message: &str);

    /// A terminal failure.
    fn log_error(&self, error: &NetworkError);

    /// A failed attempt that is about to be retried after `delay`.
    ///
    /// Does nothing by default.
    fn log_retry(
        &self,
        _request: &TransportRequest,
        _attempt: u32,
        _delay: Duration,
        _error: &NetworkError,
    ) {
    }
}

/// [`NetworkLogger`] backed by `tracing`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TracingLogger {
    level: LogLevel,
    silent: bool,
}

impl TracingLogger {
    /// Create a logger with the given verbosity.
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            silent: false,
        }
    }

    /// Create a logger that drops everything.
    pub fn silent() -> Self {
        Self {
            level: LogLevel::Error,
            silent: true,
        }
    }

    /// The configured verbosity.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether every call is a no-op.
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    fn enabled(&self, level: LogLevel) -> bool {
        !self.silent && self.level >= level
    }
}

impl NetworkLogger for TracingLogger {
    fn log_request(&self, request: &TransportRequest) {
        if !self.enabled(LogLevel::Info) {
            return;
        }
        tracing::info!(
            target: "networker::request",
            method = %request.method,
            url = %request.url,
            "Sending request"
        );
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(
                target: "networker::request",
                headers = ?request.headers,
                body = %request.body.as_deref().map(snippet).unwrap_or_default(),
                "Request details"
            );
        }
    }

    fn log_response(&self, response: &RawResponse) {
        if !self.enabled(LogLevel::Info) {
            return;
        }
        tracing::info!(
            target: "networker::response",
            status = response.status(),
            url = %response.url(),
            bytes = response.body().len(),
            "Received response"
        );
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(
                target: "networker::response",
                headers = ?response.headers(),
                body = %snippet(response.body()),
                "Response details"
            );
        }
    }

    fn log_message(&self, title: &str, message: &str) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(target: "networker::response", "{}: {}", title, message);
        }
    }

    fn log_error(&self, error: &NetworkError) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(
                target: "networker::error",
                status = ?error.case().status_code(),
                "{}",
                error.detailed_description()
            );
        }
    }

    fn log_retry(
        &self,
        request: &TransportRequest,
        attempt: u32,
        delay: Duration,
        error: &NetworkError,
    ) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(
                target: "networker::retry",
                method = %request.method,
                url = %request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after error: {}",
                error
            );
        }
    }
}

/// First [`BODY_SNIPPET_LIMIT`] characters of a body, lossily decoded.
fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut out: String = text.chars().take(BODY_SNIPPET_LIMIT).collect();
    if text.chars().count() > BODY_SNIPPET_LIMIT {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_gating() {
        let logger = TracingLogger::new(LogLevel::Info);
        assert!(logger.enabled(LogLevel::Error));
        assert!(logger.enabled(LogLevel::Info));
        assert!(!logger.enabled(LogLevel::Debug));

        let logger = TracingLogger::new(LogLevel::Error);
        assert!(!logger.enabled(LogLevel::Info));
    }

    #[test]
    fn test_silent_disables_everything() {
        let logger = TracingLogger::silent();
        assert!(logger.is_silent());
        assert!(!logger.enabled(LogLevel::Error));
    }

    #[test]
    fn test_snippet_truncates_on_char_boundaries() {
        let body = "é".repeat(BODY_SNIPPET_LIMIT + 5);
        let out = snippet(body.as_bytes());
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), BODY_SNIPPET_LIMIT + 3);
        assert_eq!(snippet(b"short"), "short");
    }
}
