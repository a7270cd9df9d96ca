//! Configuration loading tests
//!
//! Sources are applied in order: defaults, configuration file, environment
//! variables, command-line flags. Later sources win.

use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

use tls_relay::config::{ConfigOverrides, RelayConfig, ENV_PREFIX};

const ENV_NAMES: [&str; 8] = [
    "LISTEN_ADDR",
    "BACKEND_ADDR",
    "BUFFER_SIZE",
    "TLS_ENABLED",
    "CERT_FILE_PATH",
    "KEY_FILE_PATH",
    "CONNECT_TIMEOUT",
    "LOG_LEVEL",
];

fn env_name(name: &str) -> String {
    format!("{}_{}", ENV_PREFIX, name)
}

fn clear_env() {
    for name in ENV_NAMES {
        env::remove_var(env_name(name));
    }
}

fn json_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_config_priority() {
    clear_env();

    let file = json_file(
        r#"{
            "listen_addr": "127.0.0.1:7001",
            "backend_addr": "127.0.0.1:7002",
            "buffer_size": 8,
            "connect_timeout": 30
        }"#,
    );

    env::set_var(env_name("BACKEND_ADDR"), "127.0.0.1:7102");
    env::set_var(env_name("BUFFER_SIZE"), "16");

    let flags = ConfigOverrides {
        buffer_size: Some(64),
        ..Default::default()
    };

    let config = RelayConfig::resolve([
        ConfigOverrides::from_file(file.path()).unwrap(),
        ConfigOverrides::from_env(ENV_PREFIX).unwrap(),
        flags,
    ])
    .unwrap();
    clear_env();

    // File only
    assert_eq!(config.listen_addr(), "127.0.0.1:7001");
    assert_eq!(config.connect_timeout().as_secs(), 30);
    // Environment over file
    assert_eq!(config.backend_addr(), "127.0.0.1:7102");
    // Flags over environment
    assert_eq!(config.buffer_size(), 64);
    // Defaults
    assert!(!config.tls_enabled());
    assert_eq!(config.log_level(), "info");
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    env::set_var(env_name("LISTEN_ADDR"), ":9443");
    env::set_var(env_name("TLS_ENABLED"), "TRUE");
    env::set_var(env_name("LOG_LEVEL"), "Debug");

    let overrides = ConfigOverrides::from_env(ENV_PREFIX).unwrap();
    clear_env();

    assert_eq!(overrides.listen_addr.as_deref(), Some(":9443"));
    assert_eq!(overrides.tls_enabled, Some(true));

    let config = RelayConfig::resolve([overrides]).unwrap();
    assert_eq!(config.listen_addr(), ":9443");
    assert!(config.tls_enabled());
    assert_eq!(config.log_level(), "debug");
}

#[test]
#[serial]
fn test_env_tls_enabled_other_values() {
    clear_env();
    env::set_var(env_name("TLS_ENABLED"), "yes");

    let overrides = ConfigOverrides::from_env(ENV_PREFIX).unwrap();
    clear_env();

    assert_eq!(overrides.tls_enabled, Some(false));
}

#[test]
#[serial]
fn test_env_invalid_number() {
    clear_env();
    env::set_var(env_name("BUFFER_SIZE"), "lots");

    let err = ConfigOverrides::from_env(ENV_PREFIX).unwrap_err();
    clear_env();

    assert!(err.to_string().contains("buffer size"), "{}", err);
}

#[test]
#[serial]
fn test_env_empty() {
    clear_env();

    let overrides = ConfigOverrides::from_env(ENV_PREFIX).unwrap();
    assert!(overrides.is_empty());
    assert_eq!(RelayConfig::resolve([overrides]).unwrap(), RelayConfig::default());
}

#[test]
fn test_file_with_missing_certificate() {
    let file = json_file(r#"{ "tls_enabled": true, "cert_file_path": "/no/such/server.crt" }"#);

    let err = ConfigOverrides::from_file(file.path())
        .and_then(|overrides| RelayConfig::resolve([overrides]))
        .unwrap_err();
    assert!(err.to_string().contains("cert file path"), "{}", err);
}

#[test]
fn test_file_with_unknown_field() {
    let file = json_file(r#"{ "listen": "127.0.0.1:8443" }"#);

    let err = ConfigOverrides::from_file(file.path())
        .and_then(|overrides| RelayConfig::resolve([overrides]))
        .unwrap_err();
    assert!(err.to_string().contains("parse json config"), "{}", err);
}

#[test]
fn test_invalid_values_rejected() {
    for (overrides, expected) in [
        (
            ConfigOverrides {
                backend_addr: Some("no-port".to_string()),
                ..Default::default()
            },
            "parse address",
        ),
        (
            ConfigOverrides {
                buffer_size: Some(0),
                ..Default::default()
            },
            "buffer size must be positive",
        ),
        (
            ConfigOverrides {
                buffer_size: Some(1 << 54),
                ..Default::default()
            },
            "buffer size too large",
        ),
        (
            ConfigOverrides {
                connect_timeout: Some(-5),
                ..Default::default()
            },
            "connect timeout must be positive",
        ),
        (
            ConfigOverrides {
                listen_addr: Some("127.0.0.1:9000".to_string()),
                ..Default::default()
            },
            "must be different",
        ),
    ] {
        let err = RelayConfig::resolve([overrides]).unwrap_err();
        assert!(err.to_string().contains(expected), "{}: {}", expected, err);
    }
}
