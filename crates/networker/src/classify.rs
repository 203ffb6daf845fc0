//! Error classification.
//!
//! [`classify`] turns whatever a call produced (a status code, a transport
//! failure, a decode failure, or nothing useful) into exactly one
//! [`NetworkError`]. The HTTP status wins over any failure object; a body
//! that decodes as UTF-8 is attached as the API error message.

use crate::error::{
    BAD_REQUEST_DESCRIPTION, ErrorCase, FORBIDDEN_DESCRIPTION, Failure, NOT_FOUND_DESCRIPTION,
    NetworkError, TransportError, UNAUTHORIZED_DESCRIPTION,
};
use crate::http::ResponseMetadata;
use crate::status::StatusClass;

/// Classify a failed call into a [`NetworkError`].
///
/// Pure: callers do their own logging.
pub fn classify(
    failure: Option<&Failure>,
    body: Option<&[u8]>,
    metadata: Option<&ResponseMetadata>,
) -> NetworkError {
    let case = metadata
        .and_then(|metadata| classify_status(metadata.status))
        .unwrap_or_else(|| classify_failure(failure));

    let mut error = NetworkError::new(case);
    error.set_api_error_message(api_message(body));
    error
}

/// Map an actionable status code (3xx, 4xx, 5xx) to its case.
fn classify_status(status: u16) -> Option<ErrorCase> {
    let case = match StatusClass::of(status) {
        StatusClass::ClientError => match status {
            400 => ErrorCase::BadRequest(BAD_REQUEST_DESCRIPTION.to_string()),
            401 => ErrorCase::Unauthorized(UNAUTHORIZED_DESCRIPTION.to_string()),
            403 => ErrorCase::Forbidden(FORBIDDEN_DESCRIPTION.to_string()),
            404 => ErrorCase::NotFound(NOT_FOUND_DESCRIPTION.to_string()),
            _ => unknown_status(status, "Client error"),
        },
        StatusClass::ServerError => match status {
            500 => ErrorCase::ServerError(
                "The server encountered an internal error and could not complete the request."
                    .to_string(),
            ),
            501 => ErrorCase::ServerError(
                "The server does not support the functionality required to fulfill the request."
                    .to_string(),
            ),
            502 => ErrorCase::ServerError(
                "The server received an invalid response from an upstream server.".to_string(),
            ),
            503 => ErrorCase::ServerError(
                "The server is currently unavailable, possibly due to overload or maintenance."
                    .to_string(),
            ),
            _ => unknown_status(status, "Server error"),
        },
        StatusClass::Redirection => match status {
            300 => ErrorCase::MultipleChoices(
                "The request has more than one possible response.".to_string(),
            ),
            301 => ErrorCase::MovedPermanently(
                "The resource has been moved permanently to a new URL.".to_string(),
            ),
            302 => ErrorCase::Found(
                "The resource resides temporarily under a different URL.".to_string(),
            ),
            303 => ErrorCase::SeeOther(
                "The response can be found under a different URL using GET.".to_string(),
            ),
            304 => ErrorCase::NotModified(
                "The resource has not been modified since the last request.".to_string(),
            ),
            305 => ErrorCase::UseProxy(
                "The resource must be accessed through a proxy.".to_string(),
            ),
            307 => ErrorCase::TemporaryRedirect(
                "The resource resides temporarily under a different URL; repeat the request there."
                    .to_string(),
            ),
            308 => ErrorCase::PermanentRedirect(
                "The resource has been moved permanently; repeat the request at the new URL."
                    .to_string(),
            ),
            _ => unknown_status(status, "Redirection"),
        },
        StatusClass::Informational | StatusClass::Successful | StatusClass::Unknown => return None,
    };
    Some(case)
}

fn unknown_status(status: u16, kind: &str) -> ErrorCase {
    ErrorCase::Unknown {
        status: Some(status),
        message: format!("{kind} with status code {status}."),
    }
}

fn classify_failure(failure: Option<&Failure>) -> ErrorCase {
    match failure {
        Some(Failure::Decoding(decoding)) => ErrorCase::DecodingError(decoding.message()),
        Some(Failure::Transport(transport)) => match transport {
            TransportError::Timeout => ErrorCase::TimeOut,
            TransportError::CannotFindHost(msg)
            | TransportError::CannotConnect(msg)
            | TransportError::BadUrl(msg) => ErrorCase::InvalidUrl(msg.clone()),
            TransportError::Cancelled => ErrorCase::RequestCanceled,
            TransportError::Io(_) | TransportError::Other(_) => {
                ErrorCase::Network(transport.clone())
            }
        },
        Some(Failure::Unrecognized(_)) | None => ErrorCase::unknown(),
    }
}

fn api_message(body: Option<&[u8]>) -> Option<String> {
    body.filter(|bytes| !bytes.is_empty())
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map(str::to_string)
}
