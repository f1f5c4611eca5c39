//! End-to-end round-trip tests driving the actual `TunnelServer` router and
//! protocol drivers against a loopback echo service, the way the teacher's
//! crate tests an axum router with `tower::ServiceExt::oneshot` but carried
//! further here since a tunnel's correctness is about bytes surviving the
//! whole hop, not just one handler's response.

use axum::Router;
use httunnel::mode::Mode;
use httunnel::server::TunnelServer;
use httunnel::tunnel::http_client::HttpTunnelClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_echo_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    addr
}

async fn spawn_http_server(router: Router) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[tokio::test]
async fn forward_mode_round_trips_bytes_through_the_tunnel() {
    let echo_addr = spawn_echo_server().await;

    let server = TunnelServer::new(Mode::Forward);
    let router = server.clone().router("/aiotunnel");
    let http_addr = spawn_http_server(router).await;

    let http_client = reqwest::Client::builder().build().unwrap();
    let http = HttpTunnelClient::new(http_client, format!("http://{http_addr}/aiotunnel"));

    let local_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local_addr = local_listener.local_addr().unwrap();
    let shutdown = tokio_util::sync::CancellationToken::new();

    {
        let http = http.clone();
        let shutdown = shutdown.clone();
        let target = echo_addr.to_string();
        tokio::spawn(async move {
            let (stream, _) = local_listener.accept().await.unwrap();
            httunnel::tunnel::local_protocol::run(
                stream,
                &target,
                http,
                Duration::from_millis(50),
                shutdown,
            )
            .await;
        });
    }

    let mut client_stream = TcpStream::connect(local_addr).await.unwrap();
    client_stream.write_all(b"hello tunnel").await.unwrap();

    let mut buf = [0u8; 32];
    let n = client_stream.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"hello tunnel");

    shutdown.cancel();
}

#[tokio::test]
async fn reverse_mode_round_trips_bytes_through_the_tunnel() {
    let echo_addr = spawn_echo_server().await;

    let server = TunnelServer::new(Mode::Reverse);
    let router = server.clone().router("/aiotunnel");
    let http_addr = spawn_http_server(router).await;

    let http_client = reqwest::Client::builder().build().unwrap();
    let http = HttpTunnelClient::new(http_client, format!("http://{http_addr}/aiotunnel"));

    // The address the client asks the server to expose is picked here, not
    // configured on the server at start-up: the server has no idea what
    // `expose_addr` is until the `POST` carrying it arrives.
    let expose_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let expose_addr = expose_listener.local_addr().unwrap();
    drop(expose_listener);

    let shutdown = tokio_util::sync::CancellationToken::new();
    {
        let http = http.clone();
        let shutdown = shutdown.clone();
        let dial_target = echo_addr.to_string();
        let expose_target = expose_addr.to_string();
        tokio::spawn(async move {
            httunnel::client::reverse_dial(
                dial_target,
                expose_target,
                http,
                Duration::from_millis(50),
                shutdown,
            )
            .await
            .unwrap();
        });
    }

    // Give the registration a moment to land and the listener to bind
    // before an outside connection tries to reach it.
    let mut external = loop {
        match TcpStream::connect(expose_addr).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    };

    external.write_all(b"hello reverse tunnel").await.unwrap();
    let mut buf = [0u8; 64];
    let n = external.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"hello reverse tunnel");

    shutdown.cancel();
}

#[tokio::test]
async fn unknown_cid_operations_are_silent_no_ops() {
    let server = TunnelServer::new(Mode::Forward);
    let router = server.clone().router("/aiotunnel");
    let http_addr = spawn_http_server(router).await;

    let client = reqwest::Client::new();
    let base = format!("http://{http_addr}/aiotunnel");

    let put = client
        .put(format!("{base}/does-not-exist"))
        .body("data")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), reqwest::StatusCode::OK);
    assert!(put.bytes().await.unwrap().is_empty());

    let delete = client
        .delete(format!("{base}/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn malformed_target_is_rejected_with_bad_request() {
    let server = TunnelServer::new(Mode::Forward);
    let router = server.clone().router("/aiotunnel");
    let http_addr = spawn_http_server(router).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{http_addr}/aiotunnel"))
        .body("not-a-valid-target")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
