//! `LocalTunnelProtocol`: the client-side counterpart to `TunnelProtocol`.
//! Owns a real local `TcpStream` and pumps its bytes through the server's
//! HTTP surface instead of through a shared-memory `Channel`, since this
//! side and the server run as separate processes.
//!
//! Grounded directly on `protocol.py`'s `LocalTunnelProtocol`: register via
//! POST, then run an outbound PUT pump and an inbound GET pump
//! concurrently, back off 5s (now `--backoff-ms`) on any transport error,
//! and DELETE on the way out.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::http_client::HttpTunnelClient;

const READ_BUF_SIZE: usize = 16 * 1024;

/// Registers `target` with the server and runs the tunnel for `stream`
/// until the socket closes, the server rejects it, or `shutdown` fires.
pub async fn run(
    stream: TcpStream,
    target: &str,
    http: Arc<HttpTunnelClient>,
    backoff: Duration,
    shutdown: CancellationToken,
) {
    let cid = match http.register(target).await {
        Ok(cid) => cid,
        Err(err) => {
            log::warn!("failed to register tunnel for {target}: {err}");
            return;
        }
    };
    log::debug!("registered tunnel {cid} for {target}");

    if let Err(err) = stream.set_nodelay(true) {
        log::debug!("failed to set TCP_NODELAY: {err}");
    }
    let (mut read_half, mut write_half) = stream.into_split();

    let writer = {
        let http = http.clone();
        let cid = cid.clone();
        let shutdown = shutdown.clone();
        async move {
            let mut buf = BytesMut::with_capacity(READ_BUF_SIZE);
            loop {
                buf.clear();
                buf.resize(READ_BUF_SIZE, 0);
                let read = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    read = read_half.read(&mut buf) => read,
                };
                match read {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = Bytes::copy_from_slice(&buf[..n]);
                        if !put_with_retry(&http, &cid, chunk, backoff, &shutdown).await {
                            break;
                        }
                    }
                    Err(err) => {
                        log::debug!("local read failed for {cid}: {err}");
                        break;
                    }
                }
            }
        }
    };

    let reader = {
        let http = http.clone();
        let cid = cid.clone();
        let shutdown = shutdown.clone();
        async move {
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    chunk = get_with_retry(&http, &cid, backoff, &shutdown) => chunk,
                };
                let Some(chunk) = chunk else { break };
                if chunk.is_empty() {
                    continue;
                }
                if let Err(err) = write_half.write_all(&chunk).await {
                    log::debug!("local write failed for {cid}: {err}");
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        }
    };

    tokio::join!(writer, reader);
    shutdown.cancel();

    if let Err(err) = http.delete(&cid).await {
        log::debug!("failed to tear down tunnel {cid}: {err}");
    }
}

/// PUTs one chunk, retrying recoverable transport errors after `backoff`.
/// Returns `false` once `shutdown` fires or the error isn't recoverable.
async fn put_with_retry(
    http: &HttpTunnelClient,
    cid: &str,
    chunk: Bytes,
    backoff: Duration,
    shutdown: &CancellationToken,
) -> bool {
    loop {
        match http.put(cid, chunk.clone()).await {
            Ok(()) => return true,
            Err(err) if err.is_recoverable() => {
                log::debug!("put for {cid} failed, retrying in {backoff:?}: {err}");
                if wait_or_shutdown(backoff, shutdown).await {
                    return false;
                }
            }
            Err(err) => {
                log::warn!("put for {cid} failed: {err}");
                return false;
            }
        }
    }
}

/// GETs the next chunk, retrying recoverable transport errors after
/// `backoff`. Returns `None` once `shutdown` fires or the error isn't
/// recoverable.
async fn get_with_retry(
    http: &HttpTunnelClient,
    cid: &str,
    backoff: Duration,
    shutdown: &CancellationToken,
) -> Option<Bytes> {
    loop {
        match http.get(cid).await {
            Ok(chunk) => return Some(chunk),
            Err(err) if err.is_recoverable() => {
                log::debug!("get for {cid} failed, retrying in {backoff:?}: {err}");
                if wait_or_shutdown(backoff, shutdown).await {
                    return None;
                }
            }
            Err(err) => {
                log::warn!("get for {cid} failed: {err}");
                return None;
            }
        }
    }
}

/// Waits out `backoff`, returning early (with `true`) if `shutdown` fires first.
async fn wait_or_shutdown(backoff: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(backoff) => false,
    }
}
