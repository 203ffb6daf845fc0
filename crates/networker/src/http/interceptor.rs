//! Request interceptors.
//!
//! Interceptors run in registration order on every outgoing
//! [`TransportRequest`], after it was built and before it is dispatched.
//! Each one sees the mutations of the previous ones. They cannot fail; an
//! interceptor that cannot do its job leaves the request untouched.

use std::sync::Arc;

use base64::Engine;

use super::request::TransportRequest;

/// Type alias for request interceptors.
///
/// Request interceptors are called before each request is sent and can
/// modify the request (add headers, rewrite the URL, replace the body, etc.).
pub type RequestInterceptor = Arc<dyn Fn(&mut TransportRequest) + Send + Sync>;

/// Run every interceptor over `request`, in order.
pub fn apply_interceptors(interceptors: &[RequestInterceptor], request: &mut TransportRequest) {
    for interceptor in interceptors {
        interceptor(request);
    }
}

/// Set a header on every request, replacing any existing value.
///
/// Invalid names or values produce an interceptor that does nothing.
pub fn default_header(name: impl AsRef<str>, value: impl AsRef<str>) -> RequestInterceptor {
    let parsed = (
        http::HeaderName::try_from(name.as_ref()),
        http::HeaderValue::try_from(value.as_ref()),
    );
    match parsed {
        (Ok(name), Ok(value)) => Arc::new(move |request: &mut TransportRequest| {
            request.headers.insert(name.clone(), value.clone());
        }),
        _ => {
            tracing::warn!(
                target: "networker::request",
                "Ignoring invalid default header {}",
                name.as_ref()
            );
            Arc::new(|_: &mut TransportRequest| {})
        }
    }
}

/// Adds `Authorization: Bearer <token>` to all requests.
pub fn bearer_auth(token: impl AsRef<str>) -> RequestInterceptor {
    authorization(format!("Bearer {}", token.as_ref()))
}

/// Adds HTTP Basic authentication to all requests.
pub fn basic_auth(username: impl AsRef<str>, password: Option<&str>) -> RequestInterceptor {
    let credentials = format!("{}:{}", username.as_ref(), password.unwrap_or_default());
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
    authorization(format!("Basic {encoded}"))
}

/// Adds the specified header with the API key to all requests.
///
/// # Example
///
/// ```ignore
/// // X-API-Key: my-secret-key
/// builder.add_request_interceptor(interceptor::api_key("X-API-Key", "my-secret-key"))
/// ```
pub fn api_key(header: impl AsRef<str>, key: impl AsRef<str>) -> RequestInterceptor {
    default_header(header, key)
}

fn authorization(value: String) -> RequestInterceptor {
    match http::HeaderValue::try_from(value) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Arc::new(move |request: &mut TransportRequest| {
                request
                    .headers
                    .insert(http::header::AUTHORIZATION, value.clone());
            })
        }
        Err(_) => {
            tracing::warn!(target: "networker::request", "Ignoring invalid authorization value");
            Arc::new(|_: &mut TransportRequest| {})
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn request() -> TransportRequest {
        TransportRequest::new(
            HttpMethod::Get,
            url::Url::parse("https://example.com/a").unwrap(),
        )
    }

    #[test]
    fn test_interceptors_run_in_order() {
        let first: RequestInterceptor = Arc::new(|r: &mut TransportRequest| {
            r.headers
                .insert("x-trace", http::HeaderValue::from_static("first"));
        });
        let second: RequestInterceptor = Arc::new(|r: &mut TransportRequest| {
            let seen = r.header("x-trace").unwrap_or_default().to_string();
            r.headers.insert(
                "x-trace",
                http::HeaderValue::try_from(format!("{seen},second")).unwrap(),
            );
        });

        let mut req = request();
        apply_interceptors(&[first, second], &mut req);
        assert_eq!(req.header("x-trace"), Some("first,second"));
    }

    #[test]
    fn test_auth_helpers() {
        let mut req = request();
        bearer_auth("abc")(&mut req);
        assert_eq!(req.header("authorization"), Some("Bearer abc"));

        basic_auth("user", Some("pass"))(&mut req);
        assert_eq!(req.header("authorization"), Some("Basic dXNlcjpwYXNz"));

        api_key("X-API-Key", "secret")(&mut req);
        assert_eq!(req.header("x-api-key"), Some("secret"));
    }

    #[test]
    fn test_invalid_header_is_a_no_op() {
        let mut req = request();
        default_header("bad header", "v")(&mut req);
        assert!(req.headers.is_empty());
    }
}
