//! `TunnelServer`: the HTTP-facing side. Builds the axum router the teacher's
//! `main.rs` would recognize (`Router::new().route(...).with_state(...)`),
//! and serves it either plainly or TLS-terminated, since the pack carries no
//! `axum-server`-equivalent crate (confirmed absent across every example) to
//! hand that second case off to.

pub mod handlers;
pub mod registry;

use axum::routing::{get, post};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tower::Service;
use uuid::Uuid;

use crate::error::TunnelError;
use crate::mode::Mode;
use crate::tunnel::{protocol, Channel};
use registry::{ConnectionRecord, Registry};

pub struct TunnelServer {
    pub registry: Registry,
    mode: Mode,
    shutdown: CancellationToken,
}

impl TunnelServer {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            registry: Registry::new(),
            mode,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn router(self: Arc<Self>, base_path: &str) -> Router {
        let with_cid = format!("{base_path}/:cid");
        Router::new()
            .route(base_path, post(handlers::register))
            .route(
                &with_cid,
                get(handlers::get).put(handlers::put).delete(handlers::delete),
            )
            .with_state(self)
    }

    /// `POST /{base}` business logic: mint a `cid`, then either dial
    /// `target` (forward mode) or begin listening on it (reverse mode).
    async fn register(&self, target: String) -> Result<String, TunnelError> {
        match self.mode {
            Mode::Forward => self.register_forward(target).await,
            Mode::Reverse => self.register_reverse(target).await,
        }
    }

    async fn register_forward(&self, target: String) -> Result<String, TunnelError> {
        let (host, port) = split_target(&target)?;
        let stream = tokio::net::TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| TunnelError::ConnectFailed {
                addr: target.clone(),
                source,
            })?;

        let cid = self.mint_cid()?;
        let channel = Arc::new(Channel::new());
        let shutdown = CancellationToken::new();
        self.registry.insert(
            cid.clone(),
            ConnectionRecord {
                channel: channel.clone(),
                shutdown: shutdown.clone(),
            },
        );

        tokio::spawn(protocol::run(stream, channel, shutdown));
        Ok(cid)
    }

    /// Reverse mode: `target` is the externally-visible `host:port` the
    /// caller wants exposed, exactly as `tunneld.py`'s `post_aiotunnel`
    /// reads it straight out of the `POST` body (`service.split(':')`) and
    /// hands to `create_endpoint`, rather than from any server-side
    /// start-up configuration — the client picks the exposed port on every
    /// registration. Binds synchronously so a bad address is rejected in
    /// the `POST` response instead of failing silently in a detached task;
    /// the accept loop itself then runs in the background, matching the
    /// original's `loop.create_task(self.create_endpoint(...))`.
    async fn register_reverse(&self, target: String) -> Result<String, TunnelError> {
        let (host, port) = split_target(&target)?;
        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|source| TunnelError::ListenFailed {
                addr: target.clone(),
                source,
            })?;

        let cid = self.mint_cid()?;
        let channel = Arc::new(Channel::new());
        let shutdown = CancellationToken::new();
        self.registry.insert(
            cid.clone(),
            ConnectionRecord {
                channel: channel.clone(),
                shutdown: shutdown.clone(),
            },
        );

        tokio::spawn(reverse_accept_loop(listener, channel, shutdown));
        Ok(cid)
    }

    fn mint_cid(&self) -> Result<String, TunnelError> {
        for _ in 0..8 {
            let cid = Uuid::new_v4().to_string();
            if self.registry.channel(&cid).is_none() {
                return Ok(cid);
            }
        }
        Err(TunnelError::CidCollision)
    }

    pub fn close_all(&self) {
        self.registry.close_all();
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

fn split_target(target: &str) -> Result<(String, u16), TunnelError> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| TunnelError::MalformedTarget(target.to_string()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| TunnelError::MalformedTarget(target.to_string()))?;
    Ok((host.to_string(), port))
}

/// Accepts connections on a single reverse-mode listener for as long as its
/// `cid` lives, relaying every one of them through the *same* `Channel` —
/// the original aiotunnel reverse mode shares one `Channel` across every
/// connection accepted on a listener, and this is carried over unchanged
/// (see the design notes) rather than fixed, along with a one-time warning
/// the moment a second concurrent connection is observed.
async fn reverse_accept_loop(listener: TcpListener, channel: Arc<Channel>, shutdown: CancellationToken) {
    let mut first = true;
    let mut warned = false;
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("reverse listener accept failed: {err}");
                continue;
            }
        };
        if first {
            first = false;
        } else if !warned {
            warned = true;
            log::warn!(
                "reverse mode: a second connection was accepted on the listener while the \
                 first is still active; both share one channel and their traffic will interleave"
            );
        }
        log::debug!("reverse listener accepted {peer}");
        tokio::spawn(protocol::run(stream, channel.clone(), shutdown.clone()));
    }
}

/// Serves `router` on a plain TCP listener with graceful shutdown tied to
/// `shutdown` firing (DELETE-driven cleanup happens separately, through the
/// registry; this only stops accepting new HTTP connections).
pub async fn serve_plain(
    router: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), crate::error::StartupError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| crate::error::StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|source| crate::error::StartupError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serves `router` behind a `tokio_rustls::TlsAcceptor`, since nothing in
/// the example pack wraps `axum::serve` with TLS directly. Each accepted
/// connection is handshaked and then handed to `hyper_util`'s auto
/// connection builder, which drives the same `tower::Service` the plain
/// listener uses.
pub async fn serve_tls(
    router: Router,
    addr: SocketAddr,
    tls_config: Arc<rustls::ServerConfig>,
    shutdown: CancellationToken,
) -> Result<(), crate::error::StartupError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| crate::error::StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let acceptor = TlsAcceptor::from(tls_config);

    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("TLS listener accept failed: {err}");
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    log::debug!("TLS handshake with {peer} failed: {err}");
                    return;
                }
            };
            let service = hyper::service::service_fn(move |req: axum::http::Request<hyper::body::Incoming>| {
                let mut router = router.clone();
                async move {
                    Service::call(&mut router, req.map(axum::body::Body::new)).await
                }
            });
            if let Err(err) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(tls_stream), service)
                .await
            {
                log::debug!("connection with {peer} ended: {err}");
            }
        });
    }
    Ok(())
}
