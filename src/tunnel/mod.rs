//! Tunnel-protocol internals: the `Channel` shared between an HTTP handler
//! and a TCP socket, and the two protocol drivers (`protocol`, server-side
//! real-TCP; `local_protocol`, client-side HTTP-polling) that move bytes
//! across it.

pub mod channel;
pub mod http_client;
pub mod local_protocol;
pub mod protocol;

pub use channel::Channel;
