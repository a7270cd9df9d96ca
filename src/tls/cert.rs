//! Certificate inspection helpers
//!
//! Used for startup logging only; failures here are never fatal to the relay.

use openssl::hash::MessageDigest;
use openssl::x509::X509;
use std::fs;
use std::path::Path;

use crate::common::{RelayError, Result};

/// Load the first certificate from a PEM file
pub fn load_cert(cert_path: &Path) -> Result<X509> {
    let pem = fs::read(cert_path).map_err(|e| {
        RelayError::Credential(format!("read certificate {}: {}", cert_path.display(), e))
    })?;

    X509::from_pem(&pem).map_err(|e| {
        RelayError::Credential(format!("parse certificate {}: {}", cert_path.display(), e))
    })
}

/// Get the certificate subject as `KEY=value, ...`
pub fn get_cert_subject(cert_path: &Path) -> Result<String> {
    let cert = load_cert(cert_path)?;

    let subject = cert
        .subject_name()
        .entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry
                .data()
                .as_utf8()
                .map(|v| v.to_string())
                .unwrap_or_default();
            format!("{}={}", key, value)
        })
        .collect::<Vec<_>>()
        .join(", ");

    Ok(subject)
}

/// Get the SHA-256 fingerprint as colon-separated upper-case hex
pub fn get_cert_fingerprint(cert_path: &Path) -> Result<String> {
    let cert = load_cert(cert_path)?;
    let digest = cert.digest(MessageDigest::sha256())?;

    Ok(digest
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":"))
}
