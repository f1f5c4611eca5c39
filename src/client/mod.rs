//! The local-facing side: forward mode owns a local listener and spawns one
//! `LocalTunnelProtocol` per accepted connection; reverse mode dials the
//! local target once and runs a single `LocalTunnelProtocol` for the
//! lifetime of the process, mirroring `tunnel.py`'s `create_endpoint()` /
//! `open_connection()` split.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::StartupError;
use crate::tunnel::http_client::HttpTunnelClient;
use crate::tunnel::local_protocol;

/// Forward mode: bind `addr:port` locally, and for every accepted
/// connection register `target` with the server and pump bytes for it.
pub async fn forward_listen(
    addr: &str,
    port: u16,
    target: String,
    http: Arc<HttpTunnelClient>,
    backoff: Duration,
    shutdown: CancellationToken,
) -> Result<(), StartupError> {
    let listener = TcpListener::bind((addr, port))
        .await
        .map_err(|source| StartupError::Bind {
            addr: format!("{addr}:{port}"),
            source,
        })?;
    log::info!("listening on {addr}:{port}, forwarding to {target}");

    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("accept failed: {err}");
                continue;
            }
        };
        log::debug!("accepted local connection from {peer}");

        let http = http.clone();
        let target = target.clone();
        let backoff = backoff;
        let conn_shutdown = shutdown.child_token();
        tokio::spawn(async move {
            local_protocol::run(stream, &target, http, backoff, conn_shutdown).await;
        });
    }
    Ok(())
}

/// Reverse mode: dial `dial_target` once (the real local service), then run
/// a single `LocalTunnelProtocol` that registers `expose_target` with the
/// server — the `host:port` the server should bind and accept external
/// connections on, per `POST` body, matching `tunneld.py`'s
/// `post_aiotunnel`. Mirrors the original's `open_connection()`, which has
/// no accept loop at all: one dial, one tunnel.
pub async fn reverse_dial(
    dial_target: String,
    expose_target: String,
    http: Arc<HttpTunnelClient>,
    backoff: Duration,
    shutdown: CancellationToken,
) -> Result<(), StartupError> {
    let (host, port) = dial_target
        .rsplit_once(':')
        .ok_or_else(|| StartupError::Config(format!("invalid target {dial_target}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| StartupError::Config(format!("invalid target {dial_target}")))?;

    let stream = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(|source| StartupError::Bind {
            addr: dial_target.clone(),
            source,
        })?;
    log::info!("dialed local target {dial_target}, registering {expose_target} with server");

    local_protocol::run(stream, &expose_target, http, backoff, shutdown).await;
    Ok(())
}
