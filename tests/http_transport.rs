use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use pathspeed::settings::Endpoints;
use pathspeed::speedtest::{HttpTransport, TransferOutcome, Transport, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

async fn listen() -> (TcpListener, HttpTransport) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    let transport = HttpTransport::new(Endpoints::for_server(&format!("http://{addr}")))
        .expect("client builds");
    (listener, transport)
}

/// Reads up to the end of the request head. Returns the head and whatever
/// body bytes arrived with it.
async fn read_head(socket: &mut TcpStream) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        assert!(n > 0, "client closed before finishing the request head");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let body = buf.split_off(end + 4);
            return (String::from_utf8_lossy(&buf).into_owned(), body);
        }
    }
}

fn drain(mut rx: mpsc::Receiver<f64>) -> Vec<f64> {
    let mut rates = Vec::new();
    while let Ok(rate) = rx.try_recv() {
        rates.push(rate);
    }
    rates
}

#[tokio::test]
async fn probe_reports_error_status() {
    let (listener, transport) = listen().await;
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        read_head(&mut socket).await;
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .expect("write response");
    });

    match transport.probe().await {
        Err(TransportError::Status(status)) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn probe_times_successful_round_trip() {
    let (listener, transport) = listen().await;
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let (head, _) = read_head(&mut socket).await;
        assert!(head.starts_with("GET /__down?bytes=0 "), "{head}");
        tokio::time::sleep(Duration::from_millis(20)).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .expect("write response");
    });

    let elapsed = transport.probe().await.expect("probe succeeds");
    assert!(elapsed >= Duration::from_millis(20));
}

#[tokio::test]
async fn download_stops_at_deadline_without_error() {
    let (listener, transport) = listen().await;
    let (head_tx, head_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let (head, _) = read_head(&mut socket).await;
        let _ = head_tx.send(head);
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000000000\r\n\r\n")
            .await
            .expect("write head");
        // Trickle the body until the client hangs up.
        let block = [0u8; 16 * 1024];
        while socket.write_all(&block).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let (tx, rx) = mpsc::channel(64);
    let deadline = Instant::now() + Duration::from_millis(800);
    let outcome = transport.stream_download(deadline, 4096, tx).await;

    assert!(matches!(outcome, Ok(TransferOutcome::Cancelled)), "{outcome:?}");
    assert!(Instant::now() >= deadline);
    let rates = drain(rx);
    assert!(!rates.is_empty());
    assert!(rates.iter().all(|rate| *rate > 0.0));

    let head = head_rx.await.expect("request head");
    assert!(head.starts_with("GET /__down?bytes=4096 "), "{head}");
}

#[tokio::test]
async fn download_reports_error_status() {
    let (listener, transport) = listen().await;
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        read_head(&mut socket).await;
        socket
            .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .expect("write response");
    });

    let (tx, _rx) = mpsc::channel(64);
    let deadline = Instant::now() + Duration::from_secs(5);
    match transport.stream_download(deadline, 4096, tx).await {
        Err(TransportError::Status(status)) => {
            assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE)
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_sends_whole_payload_and_reports_rates() {
    const PAYLOAD: usize = 16 * 1_000_000;

    let (listener, transport) = listen().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let (head, body) = read_head(&mut socket).await;
        let mut received = body.len();
        let mut buf = vec![0u8; 64 * 1024];
        // Read slowly so the client has to keep feeding the body.
        while received < PAYLOAD {
            let n = socket.read(&mut buf).await.expect("read body");
            assert!(n > 0, "client closed mid-body");
            received += n;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .expect("write response");
        (head, received)
    });

    let (tx, rx) = mpsc::channel(64);
    let deadline = Instant::now() + Duration::from_secs(30);
    let outcome = transport
        .stream_upload(deadline, Bytes::from(vec![7u8; PAYLOAD]), tx)
        .await;

    assert!(matches!(outcome, Ok(TransferOutcome::Completed)), "{outcome:?}");
    let rates = drain(rx);
    assert!(!rates.is_empty());
    assert!(rates.iter().all(|rate| *rate > 0.0));

    let (head, received) = server.await.expect("server task");
    assert!(head.starts_with("POST /__up "), "{head}");
    assert_eq!(received, PAYLOAD);
}
