//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::handshake::client::Response;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ws_gatekeeper::config::ServerConfig;
use ws_gatekeeper::lifecycle::startup::{serve, StartupError};
use ws_gatekeeper::lifecycle::Shutdown;
use ws_gatekeeper::net::Listener;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), StartupError>>,
}

/// Default config bound to 127.0.0.1:0 with fast push timing.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_host = "127.0.0.1".into();
    config.listener.port = 0;
    config.session.push_interval_ms = 20;
    config.session.close_timeout_ms = 500;
    config.observability.shutdown_grace_secs = 5;
    config
}

pub async fn start_server(config: ServerConfig) -> TestServer {
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(serve(config, listener, None, shutdown.clone()));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Open a WebSocket to `addr` presenting `host` in the Host header.
pub async fn connect(
    addr: SocketAddr,
    host: &'static str,
    path: &str,
) -> Result<(Client, Response), tokio_tungstenite::tungstenite::Error> {
    let mut request = format!("ws://{addr}{path}").into_client_request()?;
    request
        .headers_mut()
        .insert(header::HOST, HeaderValue::from_static(host));
    connect_async(request).await
}

/// Send raw bytes and collect whatever the server writes back before it
/// closes the connection or goes quiet.
pub async fn raw_exchange(addr: SocketAddr, request: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match tokio::time::timeout(Duration::from_millis(500), stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
            Ok(Ok(n)) => received.extend_from_slice(&buf[..n]),
        }
    }
    received
}
