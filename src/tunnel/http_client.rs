//! `HttpTunnelClient`: the four HTTP calls a `LocalTunnelProtocol` makes
//! against the server's `/aiotunnel` surface, grounded on the teacher's
//! `reqwest::get(...).await?.text()/.json()` usage in `utils::net`, wrapped
//! around a single pooled `reqwest::Client` instead of one-off `get` calls
//! since this side makes many requests per `cid` over the process lifetime.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum HttpTunnelError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected the request with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

impl HttpTunnelError {
    /// Transport errors and 5xx are worth retrying after a back-off;
    /// anything else (a 4xx we didn't expect) is logged and moved past.
    pub fn is_recoverable(&self) -> bool {
        match self {
            HttpTunnelError::Transport(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            HttpTunnelError::UnexpectedStatus(status) => status.is_server_error(),
        }
    }
}

pub struct HttpTunnelClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTunnelClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Arc<Self> {
        Arc::new(Self { client, base_url })
    }

    pub fn builder(tls: Option<Arc<rustls::ClientConfig>>) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder().timeout(Duration::from_secs(30));
        match tls {
            Some(config) => builder.use_preconfigured_tls((*config).clone()),
            None => builder,
        }
    }

    /// `POST /{base}` with the target `host:port` as the body; returns the
    /// `cid` the server minted for this connection.
    pub async fn register(&self, target: &str) -> Result<String, HttpTunnelError> {
        let response = self
            .client
            .post(&self.base_url)
            .body(target.to_string())
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    /// `PUT /{base}/{cid}` carrying one chunk of outbound data.
    pub async fn put(&self, cid: &str, chunk: Bytes) -> Result<(), HttpTunnelError> {
        let response = self
            .client
            .put(format!("{}/{cid}", self.base_url))
            .body(chunk)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// `GET /{base}/{cid}`, long-polling for the next inbound chunk. An
    /// empty body means nothing is ready yet, not that the tunnel closed.
    pub async fn get(&self, cid: &str) -> Result<Bytes, HttpTunnelError> {
        let response = self
            .client
            .get(format!("{}/{cid}", self.base_url))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?)
    }

    /// `DELETE /{base}/{cid}`, tearing down the server's side of the tunnel.
    pub async fn delete(&self, cid: &str) -> Result<(), HttpTunnelError> {
        let response = self
            .client
            .delete(format!("{}/{cid}", self.base_url))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HttpTunnelError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(HttpTunnelError::UnexpectedStatus(response.status()))
    }
}
