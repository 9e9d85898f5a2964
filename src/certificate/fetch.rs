//! Certificate chain retrieval
//!
//! Dials a TLS service and returns the chain exactly as the peer presented
//! it. Trust is not evaluated here: the handshake accepts any certificate
//! so that expired, self-signed and misordered chains can still be examined.

use crate::certificate::parse::parse_certificate;
use crate::models::Certificate;
use crate::utils::FetchError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where and how to connect
#[derive(Debug, Clone)]
pub struct FetchTarget {
    /// Host to connect to
    pub server: String,
    /// TCP port
    pub port: u16,
    /// Name sent via SNI, defaults to `server`
    pub sni: Option<String>,
    /// Bound on connect, read and write
    pub timeout: Duration,
}

impl FetchTarget {
    pub fn new(server: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            port,
            sni: None,
            timeout,
        }
    }

    pub fn with_sni(mut self, sni: Option<String>) -> Self {
        self.sni = sni.filter(|s| !s.trim().is_empty());
        self
    }

    /// `host:port`, bracketing IPv6 literals
    pub fn address(&self) -> String {
        if self.server.contains(':') && !self.server.starts_with('[') {
            format!("[{}]:{}", self.server, self.port)
        } else {
            format!("{}:{}", self.server, self.port)
        }
    }
}

/// A retrieved chain plus connection facts
#[derive(Debug, Clone)]
pub struct FetchedChain {
    pub certificates: Vec<Certificate>,
    pub peer: SocketAddr,
    pub protocol: String,
    pub handshake_ms: u128,
}

/// Retrieve the certificate chain presented by `target`
pub fn fetch_chain(target: &FetchTarget) -> Result<FetchedChain, FetchError> {
    let start = Instant::now();
    let address = target.address();

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| FetchError::TlsConfig {
            message: e.to_string(),
        })?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
        .with_no_client_auth();

    let sni = target
        .sni
        .as_deref()
        .unwrap_or(&target.server)
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let server_name = ServerName::try_from(sni.clone())
        .map_err(|_| FetchError::InvalidServerName { name: sni })?;

    let mut conn =
        ClientConnection::new(Arc::new(config), server_name).map_err(|e| FetchError::TlsConfig {
            message: e.to_string(),
        })?;

    let socket_addr = address
        .to_socket_addrs()
        .map_err(|source| FetchError::Resolve {
            address: address.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| FetchError::NoAddresses {
            address: address.clone(),
        })?;

    tracing::debug!(%address, peer = %socket_addr, "connecting");

    let connect_err = |source| FetchError::Connect {
        address: address.clone(),
        source,
    };
    let mut sock = TcpStream::connect_timeout(&socket_addr, target.timeout).map_err(connect_err)?;
    sock.set_read_timeout(Some(target.timeout))
        .map_err(connect_err)?;
    sock.set_write_timeout(Some(target.timeout))
        .map_err(connect_err)?;

    while conn.is_handshaking() {
        conn.complete_io(&mut sock)
            .map_err(|source| FetchError::Handshake {
                address: address.clone(),
                source,
            })?;
    }

    let protocol = conn
        .protocol_version()
        .map(|v| format!("{:?}", v))
        .unwrap_or_else(|| "Unknown".to_string());

    let peer_certs = conn
        .peer_certificates()
        .filter(|certs| !certs.is_empty())
        .ok_or_else(|| FetchError::NoCertificates {
            address: address.clone(),
        })?;

    let certificates = peer_certs
        .iter()
        .enumerate()
        .map(|(i, der)| {
            parse_certificate(der.as_ref()).map_err(|e| FetchError::Parse {
                address: address.clone(),
                index: i + 1,
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let handshake_ms = start.elapsed().as_millis();
    tracing::info!(
        %address,
        certs = certificates.len(),
        %protocol,
        handshake_ms,
        "retrieved certificate chain"
    );

    Ok(FetchedChain {
        certificates,
        peer: socket_addr,
        protocol,
        handshake_ms,
    })
}

/// Verifier that accepts every certificate; the chain is examined afterwards
#[derive(Debug)]
struct AcceptAllVerifier;

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}
