//! Network utility functions
//!
//! Addresses are kept as `host:port` strings so that host names are resolved
//! at dial time rather than once at startup.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use super::error::{RelayError, Result};

/// Split a `host:port` string into its host and port parts
///
/// IPv6 hosts must be bracketed (`[::1]:80`). The host may be empty
/// (`:8080`), meaning every interface.
pub fn split_host_port(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| split_error(addr, "missing port in address"))?;

    let host = if let Some(inner) = host.strip_prefix('[') {
        inner
            .strip_suffix(']')
            .ok_or_else(|| split_error(addr, "missing ']' in address"))?
    } else if host.contains(':') {
        return Err(split_error(addr, "too many colons in address"));
    } else {
        host
    };

    let port = port
        .parse::<u16>()
        .map_err(|e| split_error(addr, &format!("invalid port: {}", e)))?;

    Ok((host.to_string(), port))
}

fn split_error(addr: &str, reason: &str) -> RelayError {
    RelayError::Config(format!("split host port {}: {}", addr, reason))
}

/// Join a host and port back into `host:port`, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Validate and normalise a `host:port` address
pub fn normalize_addr(addr: &str) -> Result<String> {
    let (host, port) = split_host_port(addr)?;
    Ok(join_host_port(&host, port))
}

/// Resolve a `host:port` address to the first socket address it names
///
/// An empty host binds every IPv4 interface.
pub fn resolve_socket_addr(addr: &str) -> Result<SocketAddr> {
    let (host, port) = split_host_port(addr)?;
    if host.is_empty() {
        return Ok(SocketAddr::new(IpAddr::from([0, 0, 0, 0]), port));
    }

    (host.as_str(), port)
        .to_socket_addrs()
        .map_err(|e| RelayError::Config(format!("Failed to resolve address {}: {}", addr, e)))?
        .next()
        .ok_or_else(|| RelayError::Config(format!("Failed to resolve address: {}", addr)))
}

/// Address to dial for a `host:port` target
///
/// An empty host means the local machine.
pub fn dial_addr(addr: &str) -> String {
    match split_host_port(addr) {
        Ok((host, port)) if host.is_empty() => join_host_port("localhost", port),
        _ => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("127.0.0.1:8080").unwrap(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(split_host_port("localhost:9000").unwrap(), ("localhost".to_string(), 9000));
        assert_eq!(split_host_port("[::1]:443").unwrap(), ("::1".to_string(), 443));
        assert_eq!(split_host_port(":8080").unwrap(), ("".to_string(), 8080));
    }

    #[test]
    fn test_split_host_port_invalid() {
        for bad in ["invalid", "::1:80", "[::1:80", "host:", "host:99999", "host:abc"] {
            let err = split_host_port(bad).unwrap_err();
            assert!(err.to_string().contains("split host port"), "{}: {}", bad, err);
        }
    }

    #[test]
    fn test_normalize_addr() {
        assert_eq!(normalize_addr("0.0.0.0:1111").unwrap(), "0.0.0.0:1111");
        assert_eq!(normalize_addr("[::1]:80").unwrap(), "[::1]:80");
        assert_eq!(normalize_addr(":8080").unwrap(), ":8080");
    }

    #[test]
    fn test_dial_addr() {
        assert_eq!(dial_addr(":9000"), "localhost:9000");
        assert_eq!(dial_addr("10.0.0.1:9000"), "10.0.0.1:9000");
    }

    #[test]
    fn test_resolve_socket_addr() {
        let addr = resolve_socket_addr("127.0.0.1:8080").unwrap();
        assert_eq!(addr.port(), 8080);

        let any = resolve_socket_addr(":7000").unwrap();
        assert!(any.ip().is_unspecified());

        assert!(resolve_socket_addr("invalid-address").is_err());
    }
}
