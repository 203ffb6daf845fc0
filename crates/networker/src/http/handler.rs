//! Turning transport outcomes into results.

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::response::{DecodedResponse, DownloadedFile, RawResponse};
use super::transport::TransportOutcome;
use crate::classify::classify;
use crate::error::{DecodingFailure, ErrorCase, Failure, NetworkError, Result};
use crate::logger::NetworkLogger;
use crate::status;

/// Validates transport outcomes and decodes JSON payloads.
///
/// Failures from [`ResponseHandler::handle`] are not logged here; the
/// networker logs once when a failure becomes terminal. Decode failures are
/// terminal by definition and are logged immediately.
#[derive(Clone)]
pub struct ResponseHandler {
    logger: Arc<dyn NetworkLogger>,
}

impl ResponseHandler {
    /// Create a handler reporting to `logger`.
    pub fn new(logger: Arc<dyn NetworkLogger>) -> Self {
        Self { logger }
    }

    /// Validate a data response.
    ///
    /// A transport error is classified (an actionable status still wins).
    /// Otherwise a missing body or missing metadata is [`ErrorCase::NoData`],
    /// a non-2xx status is classified with the body as context, and a 2xx
    /// status yields the [`RawResponse`].
    pub fn handle(&self, outcome: TransportOutcome) -> Result<RawResponse> {
        let TransportOutcome {
            body,
            metadata,
            error,
        } = outcome;

        if let Some(error) = error {
            return Err(classify(
                Some(&Failure::Transport(error)),
                body.as_deref(),
                metadata.as_ref(),
            ));
        }

        let (Some(body), Some(metadata)) = (body, metadata) else {
            return Err(NetworkError::new(ErrorCase::NoData));
        };

        if !status::is_successful(metadata.status) {
            return Err(classify(None, Some(&body[..]), Some(&metadata)));
        }

        let response = RawResponse::new(body, metadata);
        self.logger.log_response(&response);
        Ok(response)
    }

    /// Validate a download written to `destination`.
    ///
    /// Same rules as [`ResponseHandler::handle`], except that a successful
    /// download has no body to require.
    pub fn handle_download(
        &self,
        outcome: TransportOutcome,
        destination: PathBuf,
    ) -> Result<DownloadedFile> {
        let TransportOutcome {
            body,
            metadata,
            error,
        } = outcome;

        if let Some(error) = error {
            return Err(classify(
                Some(&Failure::Transport(error)),
                body.as_deref(),
                metadata.as_ref(),
            ));
        }

        let Some(metadata) = metadata else {
            return Err(NetworkError::new(ErrorCase::NoData));
        };

        if !status::is_successful(metadata.status) {
            return Err(classify(None, body.as_deref(), Some(&metadata)));
        }

        self.logger.log_message(
            "Download",
            &format!("{} saved to {}", metadata.url, destination.display()),
        );
        Ok(DownloadedFile {
            destination,
            metadata: Some(metadata),
        })
    }

    /// Parse the body of `raw` as JSON.
    ///
    /// Failures are classified as [`ErrorCase::DecodingError`] with the body
    /// attached, logged, and never retried.
    pub fn decode<T: DeserializeOwned>(&self, raw: RawResponse) -> Result<DecodedResponse<T>> {
        match serde_json::from_slice::<T>(raw.body()) {
            Ok(value) => Ok(DecodedResponse::new(raw, value)),
            Err(e) => {
                let failure = Failure::Decoding(DecodingFailure::from(&e));
                let error = classify(Some(&failure), Some(&raw.body()[..]), None);
                self.logger.log_error(&error);
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandler").finish_non_exhaustive()
    }
}
