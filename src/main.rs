//! Entry point: parse the CLI, merge in the optional config file, set up
//! logging, then dispatch to the client or server run loop. Modeled on the
//! teacher's `main.rs` shape (`load_config()` -> `logging::setup()` ->
//! build listener -> serve with graceful shutdown) even though the pieces
//! being assembled are different.

use clap::Parser;
use httunnel::cli::{self, Cli, Commands};
use httunnel::error::StartupError;
use httunnel::mode::Mode;
use httunnel::{client, config, logging, server, tls, tunnel};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("httunnel: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let file_config = config::load(cli.config.as_deref())?;
    logging::setup(cli.verbose)?;

    let base_path = config::merge(cli.base_path.clone(), file_config.base_path.clone(), "/aiotunnel".to_string());
    let backoff_ms = config::merge(cli.backoff_ms, file_config.backoff_ms, 5000);
    let backoff = Duration::from_millis(backoff_ms);

    let ca = cli.ca.clone().or_else(|| file_config.ca.clone().map(Into::into));
    let cert = cli.cert.clone().or_else(|| file_config.cert.clone().map(Into::into));
    let key = cli.key.clone().or_else(|| file_config.key.clone().map(Into::into));
    let tls_enabled = cert.is_some() && key.is_some();

    let shutdown = CancellationToken::new();
    let ctrlc_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("shutdown signal received");
        ctrlc_shutdown.cancel();
    });

    match cli.command {
        Commands::Client(args) => run_client(args, &base_path, backoff, ca, cert, key, tls_enabled, shutdown).await,
        Commands::Server(args) => run_server(args, &base_path, cert, key, ca, tls_enabled, shutdown).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_client(
    args: cli::ClientArgs,
    base_path: &str,
    backoff: Duration,
    ca: Option<std::path::PathBuf>,
    cert: Option<std::path::PathBuf>,
    key: Option<std::path::PathBuf>,
    tls_enabled: bool,
    shutdown: CancellationToken,
) -> Result<(), StartupError> {
    let scheme = if tls_enabled || ca.is_some() { "https" } else { "http" };
    let default_port = if tls_enabled || ca.is_some() { 8443 } else { 8080 };
    let server_port = args.server_port.unwrap_or(default_port);
    let base_url = format!("{scheme}://{}:{server_port}{base_path}", args.server_addr);

    let tls_config = if tls_enabled || ca.is_some() {
        Some(tls::client_config(ca.as_deref(), cert.as_deref(), key.as_deref())?)
    } else {
        None
    };

    let http_client = tunnel::http_client::HttpTunnelClient::builder(tls_config)
        .build()
        .map_err(|err| StartupError::Config(err.to_string()))?;
    let http = tunnel::http_client::HttpTunnelClient::new(http_client, base_url);

    let mode = Mode::from_flag(args.reverse);
    match mode {
        Mode::Forward => {
            let target = match (&args.target_addr, args.target_port) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                _ => {
                    return Err(StartupError::Config(
                        "forward mode requires --target-addr and --target-port".into(),
                    ))
                }
            };
            client::forward_listen(&args.addr, args.port, target, http, backoff, shutdown).await
        }
        Mode::Reverse => {
            let dial_target = match (&args.target_addr, args.target_port) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                _ => {
                    return Err(StartupError::Config(
                        "reverse mode requires --target-addr and --target-port (the real \
                         local service to dial)"
                            .into(),
                    ))
                }
            };
            let expose_target = format!("{}:{}", args.addr, args.port);
            client::reverse_dial(dial_target, expose_target, http, backoff, shutdown).await
        }
    }
}

async fn run_server(
    args: cli::ServerArgs,
    base_path: &str,
    cert: Option<std::path::PathBuf>,
    key: Option<std::path::PathBuf>,
    ca: Option<std::path::PathBuf>,
    tls_enabled: bool,
    shutdown: CancellationToken,
) -> Result<(), StartupError> {
    let mode = Mode::from_flag(args.reverse);
    let tunnel_server = server::TunnelServer::new(mode);
    let router = tunnel_server.clone().router(base_path);

    let default_port = if tls_enabled { 8443 } else { 8080 };
    let port = args.port.unwrap_or(default_port);
    let bind_addr: std::net::SocketAddr = format!("{}:{port}", args.addr)
        .parse()
        .map_err(|_| StartupError::Config(format!("invalid bind address {}:{port}", args.addr)))?;

    let serve_result = if tls_enabled {
        let cert = cert.ok_or_else(|| StartupError::Config("--cert is required for TLS".into()))?;
        let key = key.ok_or_else(|| StartupError::Config("--key is required for TLS".into()))?;
        let tls_config = tls::server_config(&cert, &key, ca.as_deref())?;
        server::serve_tls(router, bind_addr, tls_config, shutdown.clone()).await
    } else {
        server::serve_plain(router, bind_addr, shutdown.clone()).await
    };

    tunnel_server.close_all();
    serve_result
}
