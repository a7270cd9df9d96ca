//! Shared helpers for the integration tests

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::{X509Builder, X509NameBuilder};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_openssl::SslStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use tls_relay::common::BufferPool;
use tls_relay::config::ConfigOverrides;
use tls_relay::{Relay, RelayConfig, Result};

/// A self-signed certificate and key written to a temporary directory
pub struct TestCert {
    // Keeps the files alive for the duration of the test.
    _dir: TempDir,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Generate a P-256 self-signed certificate for `localhost`
pub fn self_signed_cert() -> TestCert {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let pkey = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("server.crt");
    let key_path = dir.path().join("server.key");
    std::fs::write(&cert_path, cert.to_pem().unwrap()).unwrap();
    std::fs::write(&key_path, pkey.private_key_to_pem_pkcs8().unwrap()).unwrap();

    TestCert {
        _dir: dir,
        cert: cert_path,
        key: key_path,
    }
}

/// Start a TCP server that echoes everything it receives
pub async fn echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.into_split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Open a TLS connection that accepts any server certificate
pub async fn tls_connect(addr: SocketAddr) -> SslStream<TcpStream> {
    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    builder.set_verify(SslVerifyMode::NONE);
    let ssl = builder
        .build()
        .configure()
        .unwrap()
        .verify_hostname(false)
        .into_ssl("localhost")
        .unwrap();

    let tcp = TcpStream::connect(addr).await.unwrap();
    let mut stream = SslStream::new(ssl, tcp).unwrap();
    Pin::new(&mut stream).connect().await.unwrap();
    stream
}

/// A relay running in the background
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub pool: BufferPool,
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub handle: JoinHandle<Result<()>>,
}

impl RunningRelay {
    /// Cancel the relay and wait for the accept loop and every session
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        let result = self.handle.await.unwrap();
        self.tracker.close();
        self.tracker.wait().await;
        result
    }
}

/// Build a configuration listening on an ephemeral local port
pub fn relay_config(backend: SocketAddr, mut overrides: ConfigOverrides) -> Arc<RelayConfig> {
    overrides.listen_addr.get_or_insert_with(|| "127.0.0.1:0".to_string());
    overrides.backend_addr = Some(backend.to_string());
    Arc::new(RelayConfig::resolve([overrides]).unwrap())
}

/// Bind and run a relay to `backend`
pub async fn start_relay(backend: SocketAddr, overrides: ConfigOverrides) -> RunningRelay {
    let relay = Relay::bind(relay_config(backend, overrides)).await.unwrap();
    spawn_relay(relay)
}

/// Run an already bound relay in the background
pub fn spawn_relay<L: tls_relay::proxy::Listener>(relay: Relay<L>) -> RunningRelay {
    let addr = relay.local_addr().unwrap();
    let pool = relay.buffer_pool().clone();
    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    let handle = {
        let shutdown = shutdown.clone();
        let tracker = tracker.clone();
        tokio::spawn(async move { relay.run(shutdown, tracker).await })
    };

    RunningRelay {
        addr,
        pool,
        shutdown,
        tracker,
        handle,
    }
}
