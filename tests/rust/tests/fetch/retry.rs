//! Retry behaviour of HttpFetcher
//!
//! Only network-level failures are retried; any response that arrives is
//! returned as-is.

use std::time::Duration;

use mcpindex_core::{FetchError, HttpFetcher, NetworkErrorKind, RetryPolicy};
use tests::fixtures;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_not_found_is_returned_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = fixtures::fetcher()
        .get(&format!("{}/missing", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_server_error_is_a_response_not_a_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = fixtures::fetcher()
        .get(&format!("{}/flaky", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_headers_are_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("private-token", "glpat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("private-token", "glpat".parse().unwrap());

    let response = fixtures::fetcher()
        .get_with_headers(&format!("{}/private", mock_server.uri()), &headers)
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_slow_responses_abort_and_exhaust() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::with_client(
        reqwest::Client::new(),
        RetryPolicy {
            max_retries: 3,
            base_timeout: Duration::from_millis(100),
            backoff_unit: Duration::from_millis(10),
        },
    );

    let err = fetcher
        .get(&format!("{}/slow", mock_server.uri()))
        .await
        .unwrap_err();

    match err {
        FetchError::Exhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, NetworkErrorKind::Aborted);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_failure_is_retried_then_exhausted() {
    // Grab a free port, then release it so nothing is listening
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let err = fixtures::fetcher()
        .get(&format!("{}/gone", uri))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
    assert!(err.kind().is_retriable());
}

#[tokio::test]
async fn test_stalled_body_is_aborted_and_retried() {
    let (uri, connections) = tests::servers::stalled_body().await;

    let fetcher = HttpFetcher::with_client(
        reqwest::Client::new(),
        RetryPolicy {
            max_retries: 3,
            base_timeout: Duration::from_millis(200),
            backoff_unit: Duration::from_millis(10),
        },
    );

    // 200 + 400 + 600ms of attempts; the outer bound only guards against a hang
    let err = tokio::time::timeout(Duration::from_secs(5), fetcher.get(&format!("{}/stall", uri)))
        .await
        .expect("fetch should give up on a stalled body")
        .unwrap_err();

    match err {
        FetchError::Exhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, NetworkErrorKind::Aborted);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(connections.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_body_is_buffered_with_the_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "42")
                .set_body_json(serde_json::json!({"ok": true})),
        )
        .mount(&mock_server)
        .await;

    let response = fixtures::fetcher()
        .get(&format!("{}/doc", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "42");
    let value: serde_json::Value = response.json().unwrap();
    assert_eq!(value["ok"], true);
}
