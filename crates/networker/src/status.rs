//! HTTP status code classification.

/// Broad class of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// 100-199.
    Informational,
    /// 200-299.
    Successful,
    /// 300-399.
    Redirection,
    /// 400-499.
    ClientError,
    /// 500-599.
    ServerError,
    /// Outside 100-599.
    Unknown,
}

impl StatusClass {
    /// Classify a numeric status code.
    pub fn of(code: u16) -> Self {
        match code {
            100..=199 => Self::Informational,
            200..=299 => Self::Successful,
            300..=399 => Self::Redirection,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// `200 <= code <= 299`.
pub fn is_successful(code: u16) -> bool {
    StatusClass::of(code) == StatusClass::Successful
}

/// `300 <= code <= 399`.
pub fn is_redirection(code: u16) -> bool {
    StatusClass::of(code) == StatusClass::Redirection
}

/// `400 <= code <= 499`.
pub fn is_client_error(code: u16) -> bool {
    StatusClass::of(code) == StatusClass::ClientError
}

/// `500 <= code <= 599`.
pub fn is_server_error(code: u16) -> bool {
    StatusClass::of(code) == StatusClass::ServerError
}

/// Canonical reason phrase for a status code, e.g. `"Not Found"` for 404.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
}
