//! Error types for the networking crate.
//!
//! Every failure that crosses the public boundary is a [`NetworkError`]: one
//! [`ErrorCase`] describing what went wrong plus the optional message the
//! remote API put in the response body.

use std::fmt;

/// Fixed description for a 400 response.
pub const BAD_REQUEST_DESCRIPTION: &str =
    "The request was malformed or contained invalid parameters.";
/// Fixed description for a 401 response.
pub const UNAUTHORIZED_DESCRIPTION: &str =
    "Authentication is required or the provided credentials are invalid.";
/// Fixed description for a 403 response.
pub const FORBIDDEN_DESCRIPTION: &str = "You do not have permission to access this resource.";
/// Fixed description for a 404 response.
pub const NOT_FOUND_DESCRIPTION: &str = "The requested resource could not be found.";
/// Placeholder used when no recognizable error is available.
pub const UNKNOWN_ERROR_DESCRIPTION: &str = "An unknown error occurred.";

/// A low-level failure reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The transport gave up waiting for the server.
    Timeout,
    /// The operation was cancelled before it completed.
    Cancelled,
    /// The host name could not be resolved.
    CannotFindHost(String),
    /// A connection to the host could not be established.
    CannotConnect(String),
    /// The URL was rejected by the transport.
    BadUrl(String),
    /// Reading or writing local data failed (e.g. a download destination).
    Io(String),
    /// Any other transport failure.
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::CannotFindHost(msg) => write!(f, "cannot find host: {msg}"),
            Self::CannotConnect(msg) => write!(f, "cannot connect to host: {msg}"),
            Self::BadUrl(msg) => write!(f, "bad URL: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            let message = err.to_string();
            // reqwest reports resolver failures as connect errors; the source chain says which.
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                let text = cause.to_string();
                if text.contains("dns error") || text.contains("failed to lookup address") {
                    return Self::CannotFindHost(message);
                }
                source = cause.source();
            }
            Self::CannotConnect(message)
        } else if err.is_builder() {
            Self::BadUrl(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Why a JSON payload could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodingFailure {
    /// The payload is not valid JSON or ended early.
    DataCorrupted(String),
    /// A required key is missing.
    KeyNotFound(String),
    /// A value has a different type than expected.
    TypeMismatch(String),
    /// A required value is null.
    ValueNotFound(String),
}

impl DecodingFailure {
    /// Human-readable message embedding the underlying diagnostic.
    pub fn message(&self) -> String {
        match self {
            Self::DataCorrupted(diag) => format!("The data is corrupted: {diag}"),
            Self::KeyNotFound(diag) => format!("Key not found: {diag}"),
            Self::TypeMismatch(diag) => format!("Type mismatch: {diag}"),
            Self::ValueNotFound(diag) => format!("Value not found: {diag}"),
        }
    }
}

impl From<&serde_json::Error> for DecodingFailure {
    fn from(err: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        let diag = err.to_string();
        match err.classify() {
            Category::Io | Category::Syntax | Category::Eof => Self::DataCorrupted(diag),
            Category::Data => {
                if diag.starts_with("missing field") {
                    Self::KeyNotFound(diag)
                } else if diag.starts_with("invalid type: null") {
                    Self::ValueNotFound(diag)
                } else if diag.starts_with("invalid type")
                    || diag.starts_with("invalid value")
                    || diag.starts_with("invalid length")
                {
                    Self::TypeMismatch(diag)
                } else {
                    Self::DataCorrupted(diag)
                }
            }
        }
    }
}

impl From<serde_json::Error> for DecodingFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::from(&err)
    }
}

/// A raw failure signal handed to the classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Failure reported by the transport.
    Transport(TransportError),
    /// Failure while decoding a JSON payload.
    Decoding(DecodingFailure),
    /// An error object the classifier has no specific mapping for.
    Unrecognized(String),
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<DecodingFailure> for Failure {
    fn from(err: DecodingFailure) -> Self {
        Self::Decoding(err)
    }
}

/// What went wrong, with a case-specific description.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorCase {
    /// The request URL is missing or not a valid network locator.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The transport returned no body or no response metadata.
    #[error("No Data: The response did not contain any data.")]
    NoData,
    /// The transport timed out.
    #[error("Timed Out: The request timed out.")]
    TimeOut,
    /// The networker is locked and rejects new calls.
    #[error("Locked: The networker is locked and is not accepting new requests.")]
    Locked,
    /// The request was cancelled.
    #[error("Request Canceled: The request was canceled.")]
    RequestCanceled,
    /// The response payload could not be decoded.
    #[error("Decoding Error: {0}")]
    DecodingError(String),
    /// The request payload could not be encoded.
    #[error("Encoding Error: {0}")]
    EncodingError(String),
    /// 400.
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 403.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// 404.
    #[error("Not Found: {0}")]
    NotFound(String),
    /// 500, 501, 502 or 503.
    #[error("Server Error: {0}")]
    ServerError(String),
    /// 300.
    #[error("Multiple Choices: {0}")]
    MultipleChoices(String),
    /// 301.
    #[error("Moved Permanently: {0}")]
    MovedPermanently(String),
    /// 302.
    #[error("Found: {0}")]
    Found(String),
    /// 303.
    #[error("See Other: {0}")]
    SeeOther(String),
    /// 304.
    #[error("Not Modified: {0}")]
    NotModified(String),
    /// 305.
    #[error("Use Proxy: {0}")]
    UseProxy(String),
    /// 307.
    #[error("Temporary Redirect: {0}")]
    TemporaryRedirect(String),
    /// 308.
    #[error("Permanent Redirect: {0}")]
    PermanentRedirect(String),
    /// A transport failure with no more specific mapping.
    #[error("Network Error: {0}")]
    Network(TransportError),
    /// Anything else, including unmapped status codes.
    #[error("Unknown Error: {message}")]
    Unknown {
        /// The HTTP status code, when one was received.
        status: Option<u16>,
        /// Generated description.
        message: String,
    },
}

impl ErrorCase {
    /// The placeholder case used when nothing recognizable is available.
    pub fn unknown() -> Self {
        Self::Unknown {
            status: None,
            message: UNKNOWN_ERROR_DESCRIPTION.to_string(),
        }
    }

    /// HTTP status code associated with this case, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::MultipleChoices(_) => Some(300),
            Self::MovedPermanently(_) => Some(301),
            Self::Found(_) => Some(302),
            Self::SeeOther(_) => Some(303),
            Self::NotModified(_) => Some(304),
            Self::UseProxy(_) => Some(305),
            Self::TemporaryRedirect(_) => Some(307),
            Self::PermanentRedirect(_) => Some(308),
            Self::Unknown { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this case is a redirection classification.
    pub fn is_redirection(&self) -> bool {
        matches!(
            self,
            Self::MultipleChoices(_)
                | Self::MovedPermanently(_)
                | Self::Found(_)
                | Self::SeeOther(_)
                | Self::NotModified(_)
                | Self::UseProxy(_)
                | Self::TemporaryRedirect(_)
                | Self::PermanentRedirect(_)
        )
    }
}

/// A classified network error.
///
/// `Display` renders [`NetworkError::detailed_description`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkError {
    case: ErrorCase,
    api_error_message: Option<String>,
}

impl NetworkError {
    /// Create an error without an API message.
    pub fn new(case: ErrorCase) -> Self {
        Self {
            case,
            api_error_message: None,
        }
    }

    /// Create an error carrying the message the API returned.
    pub fn with_api_message(case: ErrorCase, message: impl Into<String>) -> Self {
        Self {
            case,
            api_error_message: Some(message.into()),
        }
    }

    /// The error case.
    pub fn case(&self) -> &ErrorCase {
        &self.case
    }

    /// The raw message the API put in the response body, if any.
    pub fn api_error_message(&self) -> Option<&str> {
        self.api_error_message.as_deref()
    }

    /// Case description, followed by ` - {api message}` when one is present.
    pub fn detailed_description(&self) -> String {
        match &self.api_error_message {
            Some(message) => format!("{} - {}", self.case, message),
            None => self.case.to_string(),
        }
    }

    /// Whether this error came from a cancelled call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.case, ErrorCase::RequestCanceled)
    }

    pub(crate) fn set_api_error_message(&mut self, message: Option<String>) {
        self.api_error_message = message;
    }
}

impl From<ErrorCase> for NetworkError {
    fn from(case: ErrorCase) -> Self {
        Self::new(case)
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detailed_description())
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.case)
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
