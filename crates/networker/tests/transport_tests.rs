//! Integration tests for the reqwest-backed transport.

use std::time::Duration;

use networker::http::{ReqwestTransportBuilder, TransportConfig};
use networker::{AsyncNetworker, ReqwestTransport};

#[tokio::test]
async fn test_transport_defaults() {
    let transport = ReqwestTransport::new().expect("Failed to build transport");
    let config = transport.config();
    assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
    assert!(config.follow_redirects);
    assert_eq!(config.max_redirects, 10);
    assert!(config.cookies_enabled);
}

#[tokio::test]
async fn test_transport_builder_config() {
    let transport = ReqwestTransportBuilder::new()
        .config(TransportConfig {
            max_redirects: 3,
            ..TransportConfig::default()
        })
        .no_timeout()
        .build()
        .expect("Failed to build transport");

    assert_eq!(transport.config().max_redirects, 3);
    assert!(transport.config().timeout.is_none());
}

#[tokio::test]
async fn test_networker_with_default_transport() {
    let networker = AsyncNetworker::new().expect("Failed to build networker");
    assert!(!networker.is_locked());
    assert_eq!(networker.active_task_count(), 0);
    assert_eq!(networker.config().retry.max_retries, 3);
}

// Integration tests with wiremock
#[cfg(feature = "integration-tests")]
mod integration_tests {
    use super::*;
    use networker::http::interceptor;
    use networker::{ErrorCase, NetworkRequest};
    use serde::Deserialize;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    fn networker() -> AsyncNetworker {
        AsyncNetworker::builder()
            .retry_delay(Duration::from_millis(10))
            .silent()
            .build()
            .expect("Failed to build networker")
    }

    #[tokio::test]
    async fn test_get_decoded_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .and(query_param("expand", "true"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 1, "name": "Ada"})),
            )
            .mount(&mock_server)
            .await;

        let request = NetworkRequest::get(format!("{}/users/1", mock_server.uri()))
            .query("expand", "true");
        let decoded = networker()
            .perform_decoded::<User>(&request)
            .await
            .expect("Request failed");

        assert_eq!(decoded.raw().status(), 200);
        assert_eq!(
            decoded.value(),
            &User {
                id: 1,
                name: "Ada".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_post_json_body_and_interceptor_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"name":"Ada"}"#))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let networker = AsyncNetworker::builder()
            .add_request_interceptor(interceptor::bearer_auth("secret"))
            .silent()
            .build()
            .unwrap();
        let request = NetworkRequest::post(format!("{}/users", mock_server.uri()))
            .json(&serde_json::json!({"name": "Ada"}))
            .unwrap();

        let response = networker.perform(&request).await.expect("Request failed");
        assert_eq!(response.status(), 201);
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn test_not_found_carries_api_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = networker()
            .perform(&NetworkRequest::get(format!("{}/missing", mock_server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err.case(), ErrorCase::NotFound(_)));
        assert_eq!(err.api_error_message(), Some("no such user"));
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = networker()
            .perform(&NetworkRequest::get(format!("{}/flaky", mock_server.uri())))
            .await
            .expect("Request failed");
        assert_eq!(response.text(), "ok");
    }

    #[tokio::test]
    async fn test_cached_response_is_served_without_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cached"))
            .respond_with(ResponseTemplate::new(200).set_body_string("once"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let networker = AsyncNetworker::builder()
            .enable_cache()
            .silent()
            .build()
            .unwrap();
        let request = NetworkRequest::get(format!("{}/cached", mock_server.uri()));

        for _ in 0..3 {
            let response = networker.perform(&request).await.expect("Request failed");
            assert_eq!(response.text(), "once");
        }
    }

    #[tokio::test]
    async fn test_redirect_classified_when_not_followed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::builder().no_redirects().build().unwrap();
        let networker = AsyncNetworker::builder()
            .transport(transport)
            .silent()
            .build()
            .unwrap();

        let err = networker
            .perform(&NetworkRequest::get(format!("{}/old", mock_server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err.case(), ErrorCase::Found(_)));
    }

    #[tokio::test]
    async fn test_transport_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let networker = AsyncNetworker::builder()
            .no_retry()
            .silent()
            .build()
            .unwrap();
        let request = NetworkRequest::get(format!("{}/slow", mock_server.uri()))
            .timeout(Duration::from_millis(200));

        let err = networker.perform(&request).await.unwrap_err();
        assert_eq!(err.case(), &ErrorCase::TimeOut);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let networker = AsyncNetworker::builder()
            .no_retry()
            .silent()
            .build()
            .unwrap();
        let err = networker
            .perform(&NetworkRequest::get(format!("http://127.0.0.1:{port}/")))
            .await
            .unwrap_err();

        assert!(matches!(err.case(), ErrorCase::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_download_to_file() {
        let mock_server = MockServer::start().await;
        let content = b"Hello, World! This is test content.";
        Mock::given(method("GET"))
            .and(path("/file.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let destination = dir.path().join("file.txt");
        let file = networker()
            .download(
                &NetworkRequest::get(format!("{}/file.txt", mock_server.uri())),
                &destination,
            )
            .await
            .expect("Download failed");

        assert_eq!(file.destination, destination);
        assert_eq!(file.metadata.map(|m| m.status), Some(200));
        assert_eq!(std::fs::read(&destination).unwrap(), content);
    }

    #[tokio::test]
    async fn test_failed_download_writes_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forbidden.bin"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("forbidden.bin");
        let err = networker()
            .download(
                &NetworkRequest::get(format!("{}/forbidden.bin", mock_server.uri())),
                &destination,
            )
            .await
            .unwrap_err();

        assert!(matches!(err.case(), ErrorCase::Forbidden(_)));
        assert_eq!(err.api_error_message(), Some("denied"));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_upload_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/blob"))
            .and(body_string("raw bytes"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = networker()
            .upload(
                &NetworkRequest::put(format!("{}/blob", mock_server.uri())),
                "raw bytes",
            )
            .await
            .expect("Upload failed");
        assert_eq!(response.status(), 204);
    }
}
