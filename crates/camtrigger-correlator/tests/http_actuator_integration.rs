//! Integration tests for `HubActuator` against a local stub hub.
//!
//! The stub is a plain Tokio TCP listener that reads one HTTP request head,
//! records its request line, and answers with a fixed status (or never
//! answers, for the timeout case).

use std::net::SocketAddr;
use std::time::Duration;

use camtrigger_core::{DeviceProfile, HardwareId};
use camtrigger_correlator::infrastructure::actuation::http::HubActuator;
use camtrigger_correlator::infrastructure::actuation::{ActuationError, Actuator};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

// ── Stub hub ──────────────────────────────────────────────────────────────────

enum Reply {
    Status(u16, &'static str),
    Silent,
}

/// Serves exactly one request and sends its request line through the channel.
async fn stub_hub(reply: Reply) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let text = String::from_utf8_lossy(&head);
        let request_line = text.lines().next().unwrap_or_default().to_string();
        let _ = tx.send(request_line);

        match reply {
            Reply::Status(code, reason) => {
                let response =
                    format!("HTTP/1.1 {code} {reason}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
            Reply::Silent => {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        }
    });

    (addr, rx)
}

fn front_door() -> DeviceProfile {
    DeviceProfile::new("front_door", HardwareId::new([0xaa; 6]), "101")
}

fn hub_for(addr: SocketAddr, timeout: Duration) -> HubActuator {
    HubActuator::new(
        &format!("http://{addr}/apps/api/9/devices"),
        "s3cret",
        "on",
        timeout,
    )
    .unwrap()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// A 200 response is success, and the request carries target, command, and
/// token in the expected places.
#[tokio::test]
async fn test_successful_actuation_sends_expected_request() {
    // Arrange
    let (addr, request) = stub_hub(Reply::Status(200, "OK")).await;
    let hub = hub_for(addr, Duration::from_secs(5));

    // Act
    let result = hub.actuate(&front_door()).await;

    // Assert
    assert!(result.is_ok(), "expected success, got {result:?}");
    let line = request.await.unwrap();
    assert_eq!(
        line,
        "GET /apps/api/9/devices/101/on?access_token=s3cret HTTP/1.1"
    );
}

/// A non-2xx status is reported as `ActuationError::Status`.
#[tokio::test]
async fn test_server_error_status_is_reported() {
    let (addr, _request) = stub_hub(Reply::Status(500, "Internal Server Error")).await;
    let hub = hub_for(addr, Duration::from_secs(5));

    let result = hub.actuate(&front_door()).await;

    assert!(matches!(
        result,
        Err(ActuationError::Status { ref target, status: 500 }) if target == "101"
    ));
}

/// A hub that never answers is cut off by the configured timeout.
#[tokio::test]
async fn test_unresponsive_hub_times_out() {
    let (addr, _request) = stub_hub(Reply::Silent).await;
    let hub = hub_for(addr, Duration::from_millis(200));

    let started = std::time::Instant::now();
    let result = hub.actuate(&front_door()).await;

    assert!(matches!(result, Err(ActuationError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// A refused connection is a transport error, and its message does not leak
/// the access token.
#[tokio::test]
async fn test_connection_refused_is_transport_error_without_token() {
    // Arrange: bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let hub = hub_for(addr, Duration::from_secs(2));

    // Act
    let result = hub.actuate(&front_door()).await;

    // Assert
    let err = result.expect_err("nothing is listening");
    assert!(matches!(err, ActuationError::Transport { .. }), "got {err:?}");
    assert!(!err.to_string().contains("s3cret"));
}
