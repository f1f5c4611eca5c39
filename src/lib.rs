//! Library surface backing the `httunnel` binary, split out mainly so
//! `tests/` can drive the protocol and server internals directly instead of
//! only through a spawned process, the way the teacher's crate exposes
//! `routes`/`services` for its own `tests` modules to reach into.

pub mod cli;
pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod mode;
pub mod server;
pub mod tls;
pub mod tunnel;
