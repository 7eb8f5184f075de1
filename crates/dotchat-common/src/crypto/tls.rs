//! TLS configuration for both ends of a connection.
//!
//! The server side needs a private key and a certificate chain; the client
//! side trusts exactly the certificate it is handed and verifies the server
//! against it. Everything arrives as PEM files named on the command line.

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::error::{ChatError, Result};

/// Create a TLS server configuration from key and certificate PEM files.
pub fn server_config(key_path: &Path, cert_path: &Path) -> Result<Arc<ServerConfig>> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ChatError::Tls(format!("Failed to create server config: {e}")))?;

    Ok(Arc::new(config))
}

/// Create a TLS client configuration trusting exactly the certificate in
/// `cert_path`.
pub fn client_config(cert_path: &Path) -> Result<Arc<ClientConfig>> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs(cert_path)? {
        root_store
            .add(cert)
            .map_err(|e| ChatError::Tls(format!("Failed to add root cert: {e}")))?;
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let pem = std::fs::read(path)
        .map_err(|e| ChatError::Tls(format!("Failed to read {}: {e}", path.display())))?;
    let mut reader = std::io::BufReader::new(pem.as_slice());
    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .filter_map(|c| c.ok())
        .collect();

    if certs.is_empty() {
        return Err(ChatError::Tls(format!(
            "No certificates found in {}",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), count = certs.len(), "loaded certificates");
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let pem = std::fs::read(path)
        .map_err(|e| ChatError::Tls(format!("Failed to read {}: {e}", path.display())))?;
    let mut reader = std::io::BufReader::new(pem.as_slice());
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ChatError::Tls(format!("Failed to parse key: {e}")))?
        .ok_or_else(|| {
            ChatError::Tls(format!("No private key found in {}", path.display()))
        })
}
