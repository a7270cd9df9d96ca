//! TLS acceptor creation

use log::{debug, info};
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};
use std::path::Path;

use crate::common::{RelayError, Result};

/// Create a server-side TLS acceptor from a PEM certificate chain and key
///
/// Fails with `RelayError::Config` when either path is empty and with
/// `RelayError::Credential` when the material cannot be read, parsed, or
/// the key does not match the certificate.
///
/// # Example
///
/// ```no_run
/// # use std::path::Path;
/// # use tls_relay::tls::create_tls_acceptor;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let acceptor = create_tls_acceptor(
///     Path::new("certs/server.crt"),
///     Path::new("certs/server.key"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn create_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<SslAcceptor> {
    if cert_path.as_os_str().is_empty() || key_path.as_os_str().is_empty() {
        return Err(RelayError::Config(
            "cert file path or key file path is empty".to_string(),
        ));
    }

    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;

    debug!("Loading certificate: {:?}, key: {:?}", cert_path, key_path);
    acceptor
        .set_certificate_chain_file(cert_path)
        .map_err(|e| credential_error("load certificate", cert_path, e))?;
    acceptor
        .set_private_key_file(key_path, SslFiletype::PEM)
        .map_err(|e| credential_error("load private key", key_path, e))?;
    acceptor
        .check_private_key()
        .map_err(|e| credential_error("check private key", key_path, e))?;

    info!("Loaded TLS credentials from {}", cert_path.display());

    Ok(acceptor.build())
}

fn credential_error(what: &str, path: &Path, err: openssl::error::ErrorStack) -> RelayError {
    RelayError::Credential(format!("{} {}: {}", what, path.display(), err))
}
