//! Integration tests for the single-exchange livestatus client.
//!
//! Each test scripts a mock backend and drives one full exchange:
//! connect, framed write, fixed16 header read, body read, classify.

use livestatus_gateway::config::TimeoutConfig;
use livestatus_gateway::livestatus::{BackendTarget, LivestatusClient};
use livestatus_gateway::AppError;
use serde_json::json;

use super::test_helpers::{
    scripted_response, spawn_chunked_backend, spawn_mock_backend, spawn_mock_unix_backend,
    spawn_silent_backend, test_client, test_query,
};

// ── Happy path ───────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_over_local_socket() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("live");
    let backend = spawn_mock_unix_backend(&path, scripted_response(200, "[]"));

    let client = test_client(BackendTarget::Local { path });
    let value = client
        .execute(&test_query("GET status\\n\\n"))
        .await
        .expect("query succeeds");
    assert_eq!(value, json!([]));

    let wire = backend.await.expect("backend task");
    assert_eq!(
        wire.as_slice(),
        b"GET status\nOutputFormat:json\nResponseHeader: fixed16\n\n"
    );
}

#[tokio::test]
async fn decodes_structured_success_body() {
    let body = r#"[["host1",0],["host2",1]]"#;
    let (target, backend) = spawn_mock_backend(scripted_response(200, body)).await;

    let value = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect("query succeeds");
    assert_eq!(value, json!([["host1", 0], ["host2", 1]]));

    let wire = backend.await.expect("backend task");
    assert!(wire.starts_with(b"GET hosts\n"));
}

#[tokio::test]
async fn body_delivered_in_chunks_is_reassembled() {
    // Header first, then the 7-byte body split across two writes; the
    // read loop must accumulate until the declared length is reached.
    let header = super::test_helpers::fixed16_header(200, 7).into_bytes();
    let (target, _backend) =
        spawn_chunked_backend(vec![header, b"[1,".to_vec(), b"2,3]".to_vec()]).await;

    let value = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect("query succeeds");
    assert_eq!(value, json!([1, 2, 3]));
}

#[tokio::test]
async fn repeated_queries_yield_identical_output() {
    let body = r#"[["svc",2]]"#;
    let mut values = Vec::new();
    for _ in 0..2 {
        let (target, _backend) = spawn_mock_backend(scripted_response(200, body)).await;
        let value = test_client(target)
            .execute(&test_query("GET services\\n"))
            .await
            .expect("query succeeds");
        values.push(value);
    }
    assert_eq!(values[0], values[1]);
}

// ── Failure classification ───────────────────────────────────

#[tokio::test]
async fn non_success_status_reports_body_text() {
    let diagnostic = "Table 'foo' does not exist.";
    let (target, _backend) = spawn_mock_backend(scripted_response(404, diagnostic)).await;

    let err = test_client(target)
        .execute(&test_query("GET foo\\n"))
        .await
        .expect_err("non-200 fails");
    match err {
        AppError::Protocol(msg) => assert_eq!(msg, diagnostic),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn short_body_is_a_transport_failure() {
    // Header promises 50 bytes; the backend sends 5 and closes.
    let mut response = super::test_helpers::fixed16_header(200, 50).into_bytes();
    response.extend_from_slice(b"[1,2]");
    let (target, _backend) = spawn_mock_backend(response).await;

    let err = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("short body fails");
    assert!(matches!(err, AppError::Transport(_)), "got {err:?}");
    assert!(err.to_string().contains("5 of 50"), "got {err}");
}

#[tokio::test]
async fn truncated_header_is_a_transport_failure() {
    let (target, _backend) = spawn_mock_backend(b"200 00".to_vec()).await;

    let err = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("truncated header fails");
    assert!(matches!(err, AppError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn immediate_close_is_a_transport_failure() {
    let (target, _backend) = spawn_mock_backend(Vec::new()).await;

    let err = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("empty response fails");
    assert!(err.to_string().contains("0 of 16"), "got {err}");
}

#[tokio::test]
async fn non_numeric_length_surfaces_as_decode_failure() {
    // Length field is garbage: parsed as 0, so the empty body fails
    // JSON decoding rather than raising a header error.
    let (target, _backend) = spawn_mock_backend(b"200 abcdefghijk\n".to_vec()).await;

    let err = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("empty body fails decoding");
    match err {
        AppError::Decode(msg) => assert_eq!(msg, "the response has an invalid format"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_failure() {
    let (target, _backend) = spawn_mock_backend(scripted_response(200, "not json")).await;

    let err = test_client(target)
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("garbage body fails decoding");
    assert!(matches!(err, AppError::Decode(_)), "got {err:?}");
}

// ── Connect failures ─────────────────────────────────────────

#[tokio::test]
async fn missing_local_socket_is_a_connect_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let client = test_client(BackendTarget::Local {
        path: temp.path().join("absent"),
    });

    let err = client
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("missing socket fails");
    assert!(matches!(err, AppError::Connect(_)), "got {err:?}");
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn unreachable_tcp_backend_is_a_connect_failure() {
    // Discover a port with no listener behind it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let client = test_client(BackendTarget::Remote {
        host: "127.0.0.1".into(),
        port,
    });
    let err = client
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("refused connect fails");
    assert!(matches!(err, AppError::Connect(_)), "got {err:?}");
}

// ── Timeouts ─────────────────────────────────────────────────

#[tokio::test]
async fn read_timeout_fires_on_silent_backend() {
    let (target, _backend) = spawn_silent_backend().await;
    let client = LivestatusClient::new(
        target,
        TimeoutConfig {
            connect_seconds: 0,
            read_seconds: 1,
        },
    );

    let err = client
        .execute(&test_query("GET hosts\\n"))
        .await
        .expect_err("silent backend times out");
    assert!(matches!(err, AppError::Transport(_)), "got {err:?}");
    assert!(err.to_string().contains("timed out"), "got {err}");
}
