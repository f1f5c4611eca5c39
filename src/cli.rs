//! Command-line surface, one-to-one with the flags the original `cli.py`
//! documented, grouped into `client`/`server` subcommands the way a clap
//! derive CLI naturally wants instead of the original's single flat
//! `argparse` namespace with a `--reverse`/`--client` pair of switches.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "httunnel", about = "Tunnels TCP byte streams over HTTP(S)")]
pub struct Cli {
    /// Optional JSON config file; CLI flags take precedence over its values.
    #[arg(short = 'f', long = "file", global = true)]
    pub config: Option<PathBuf>,

    /// Force debug-level logging regardless of LOGLEVEL.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Run the tunnel endpoint the other side POSTs/PUTs/GETs/DELETEs against.
    /// Defaults to `/aiotunnel`, overridable by the config file.
    #[arg(long, global = true)]
    pub base_path: Option<String>,

    /// Fixed back-off, in milliseconds, applied after a recoverable transport
    /// error. Defaults to 5000, overridable by the config file.
    #[arg(long, global = true)]
    pub backoff_ms: Option<u64>,

    /// PEM file of the CA used to validate the peer's certificate.
    #[arg(long, global = true)]
    pub ca: Option<PathBuf>,

    /// PEM certificate chain, required to terminate or present TLS.
    #[arg(long, global = true)]
    pub cert: Option<PathBuf>,

    /// PEM private key matching `--cert`.
    #[arg(long, global = true)]
    pub key: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the local-facing side: owns a local TCP endpoint and speaks HTTP
    /// to a remote `server` to move bytes across it.
    Client(ClientArgs),
    /// Run the HTTP-facing side: exposes the `/aiotunnel` routes and owns
    /// the real TCP connection to (or from) the target service.
    Server(ServerArgs),
}

#[derive(Debug, Args)]
pub struct ClientArgs {
    /// Run this side in reverse mode: dial `--target-addr`/`--target-port`
    /// (the real local service) and ask the server to expose
    /// `--addr`/`--port` externally, instead of listening locally.
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// Forward mode: local address to bind and listen for incoming
    /// connections on. Reverse mode: the address registered with the
    /// server (carried in the `POST` body) for it to listen on and expose
    /// to the outside world.
    #[arg(short = 'a', long = "addr", default_value = "127.0.0.1")]
    pub addr: String,

    /// Port half of `--addr`.
    #[arg(short = 'p', long = "port")]
    pub port: u16,

    /// Forward mode: the downstream service address the server should
    /// dial, carried in the `POST` body that registers each accepted local
    /// connection. Reverse mode: the real local service this side dials
    /// directly, never sent to the server.
    #[arg(long = "target-addr", short = 'T')]
    pub target_addr: Option<String>,

    /// Port half of `--target-addr`.
    #[arg(long = "target-port", short = 'Q')]
    pub target_port: Option<u16>,

    /// Address of the httunnel server to talk HTTP to.
    #[arg(long = "server-addr", short = 'A')]
    pub server_addr: String,

    /// Port of the httunnel server to talk HTTP to. Defaults to 8080, or
    /// 8443 when TLS material is supplied, unless given explicitly here.
    #[arg(long = "server-port", short = 'P')]
    pub server_port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct ServerArgs {
    /// Run this side in reverse mode: listen for externally initiated
    /// connections and relay them over HTTP to the client's local target.
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// Address to bind the HTTP surface on.
    #[arg(short = 'a', long = "addr", default_value = "0.0.0.0")]
    pub addr: String,

    /// Port to bind the HTTP surface on. Defaults to 8080, or 8443 when
    /// TLS material is supplied, unless given explicitly here.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}
