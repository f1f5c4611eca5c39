//! TLS material loading. The example pack has no `axum-server`-style crate
//! anywhere, so the server side drives `tokio_rustls::TlsAcceptor` directly
//! over a manual accept loop (see `server::serve_tls`) instead of handing a
//! `rustls::ServerConfig` to a higher-level wrapper.

use crate::error::StartupError;
use std::path::Path;
use std::sync::Arc;

/// Loads a cert chain + private key into a server-side rustls config.
/// Requires both `--cert` and `--key`; `--ca` additionally turns on client
/// certificate verification.
pub fn server_config(
    cert: &Path,
    key: &Path,
    ca: Option<&Path>,
) -> Result<Arc<rustls::ServerConfig>, StartupError> {
    let chain = load_certs(cert)?;
    let key = load_key(key)?;

    let builder = rustls::ServerConfig::builder();
    let config = match ca {
        Some(ca_path) => {
            let roots = load_root_store(ca_path)?;
            let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|err| StartupError::TlsConfig(err.to_string()))?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(chain, key)
        }
        None => builder
            .with_no_client_auth()
            .with_single_cert(chain, key),
    }
    .map_err(|err| StartupError::TlsConfig(err.to_string()))?;

    Ok(Arc::new(config))
}

/// Loads a client-side rustls config. `ca` validates the server's
/// certificate; `cert`/`key` additionally present a client certificate.
pub fn client_config(
    ca: Option<&Path>,
    cert: Option<&Path>,
    key: Option<&Path>,
) -> Result<Arc<rustls::ClientConfig>, StartupError> {
    // No `--ca` means the peer's certificate can't be validated against a
    // known root; this only comes up when TLS is used with a self-signed
    // pair and no `--ca` was handed to the other side either.
    let roots = match ca {
        Some(ca_path) => load_root_store(ca_path)?,
        None => rustls::RootCertStore::empty(),
    };
    let builder = rustls::ClientConfig::builder().with_root_certificates(roots);

    let config = match (cert, key) {
        (Some(cert_path), Some(key_path)) => {
            let chain = load_certs(cert_path)?;
            let key = load_key(key_path)?;
            builder
                .with_client_auth_cert(chain, key)
                .map_err(|err| StartupError::TlsConfig(err.to_string()))?
        }
        _ => builder.with_no_client_auth(),
    };

    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, StartupError> {
    let file = std::fs::File::open(path).map_err(|source| StartupError::TlsMaterial {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| StartupError::TlsMaterial {
            path: path.display().to_string(),
            source,
        })
}

fn load_key(path: &Path) -> Result<rustls::pki_types::PrivateKeyDer<'static>, StartupError> {
    let file = std::fs::File::open(path).map_err(|source| StartupError::TlsMaterial {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| StartupError::TlsMaterial {
            path: path.display().to_string(),
            source,
        })?
        .ok_or_else(|| StartupError::TlsConfig(format!("no private key found in {}", path.display())))
}

fn load_root_store(path: &Path) -> Result<rustls::RootCertStore, StartupError> {
    let certs = load_certs(path)?;
    let mut store = rustls::RootCertStore::empty();
    for cert in certs {
        store
            .add(cert)
            .map_err(|err| StartupError::TlsConfig(err.to_string()))?;
    }
    Ok(store)
}
