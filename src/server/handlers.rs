//! The four axum handlers backing `/{base}` and `/{base}/:cid`, grounded on
//! the teacher's `PlayersError`/`IntoResponse` pattern for error mapping and
//! on the original `tunneld.py` handlers for the unknown-cid behavior: PUT,
//! GET and DELETE against a `cid` that doesn't (or no longer) exist return
//! `200` with an empty body rather than `404`, matching `aiohttp`'s
//! `web.Response()` default.

use axum::body::Bytes;
use axum::extract::{Path, State};
use std::sync::Arc;

use crate::error::TunnelError;
use super::TunnelServer;

/// `POST /{base}`: body is `host:port`. Dials (forward mode) or starts
/// listening (reverse mode) and returns the freshly minted `cid` as plain
/// text.
pub async fn register(
    State(server): State<Arc<TunnelServer>>,
    body: Bytes,
) -> Result<String, TunnelError> {
    let target = String::from_utf8_lossy(&body).trim().to_string();
    server.register(target).await
}

/// `PUT /{base}/{cid}`: body is one chunk of outbound data. A missing
/// `cid` is a silent no-op.
pub async fn put(
    State(server): State<Arc<TunnelServer>>,
    Path(cid): Path<String>,
    body: Bytes,
) -> &'static str {
    if let Some(channel) = server.registry.channel(&cid) {
        let _ = channel.push_request(body);
    }
    ""
}

/// `GET /{base}/{cid}`: pulls the next inbound chunk, or returns
/// immediately with an empty body if `cid` is unknown. Blocks (the tunnel's
/// only form of long-polling) while `cid` is known but nothing is queued
/// yet, racing that suspension against the tunnel's shutdown token so a
/// concurrent DELETE unblocks it with an empty body instead of hanging the
/// request forever.
pub async fn get(State(server): State<Arc<TunnelServer>>, Path(cid): Path<String>) -> Bytes {
    let Some((channel, shutdown)) = server.registry.channel_and_shutdown(&cid) else {
        return Bytes::new();
    };
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Bytes::new(),
        chunk = channel.pull_response() => chunk.unwrap_or_default(),
    }
}

/// `DELETE /{base}/{cid}`: tears down the tunnel side for `cid`, if it's
/// still around. A missing `cid` is a silent no-op.
pub async fn delete(State(server): State<Arc<TunnelServer>>, Path(cid): Path<String>) -> &'static str {
    server.registry.remove(&cid);
    ""
}
