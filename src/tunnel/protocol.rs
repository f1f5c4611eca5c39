//! `TunnelProtocol`: the server-side adapter that owns a real `TcpStream`
//! talking to (or from) the target service, and shuttles bytes between it
//! and a `Channel` shared with the HTTP handlers.
//!
//! Grounded on the write/read task split in the teacher's
//! `services/tunnel/mod.rs` `Tunnel`, translated from a hand-rolled
//! `Future` state machine (needed there because it drove a custom framed
//! codec) into two plain spawned tasks, since here the boundary between
//! messages is just "whatever bytes one read() call returned", not a
//! length-prefixed frame.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::channel::Channel;

const READ_BUF_SIZE: usize = 16 * 1024;

/// Drives one TCP connection for the lifetime of its `cid`.
///
/// `run` consumes the stream and does not return until either the socket
/// closes, the channel's request side closes (the HTTP side went away), or
/// `shutdown` is triggered by a DELETE.
pub async fn run(stream: TcpStream, channel: Arc<Channel>, shutdown: CancellationToken) {
    if let Err(err) = stream.set_nodelay(true) {
        log::debug!("failed to set TCP_NODELAY: {err}");
    }

    let (mut read_half, mut write_half) = stream.into_split();

    let writer = {
        let channel = channel.clone();
        let shutdown = shutdown.clone();
        async move {
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    chunk = channel.pull_request() => chunk,
                };
                let Some(chunk) = chunk else { break };
                if let Err(err) = write_half.write_all(&chunk).await {
                    log::debug!("tunnel write failed, closing connection: {err}");
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        }
    };

    let reader = {
        let channel = channel.clone();
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
                        if channel.push_response(Bytes::copy_from_slice(&buf[..n])).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log::debug!("tunnel read failed, closing connection: {err}");
                        break;
                    }
                }
            }
        }
    };

    tokio::join!(writer, reader);
    shutdown.cancel();
}
