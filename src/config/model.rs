// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [[endpoint]]
/// name = "public"
/// bind = "0.0.0.0:8443"
///
/// [[endpoint.certificate]]
/// cert = "certs/fullchain.pem"
/// key = "certs/privkey.pem"
/// ```
///
/// Relative certificate paths are resolved against the directory containing
/// the config file, by both the TLS stack and the change watcher, so the
/// watched directory is exactly the directory the certificates are read from.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// All `[[endpoint]]` sections.
    #[serde(default)]
    pub endpoint: Vec<EndpointConfig>,
}

/// One TLS listener.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Name used in log lines. Defaults to `"default"`.
    #[serde(default = "default_endpoint_name")]
    pub name: String,

    /// Socket address to bind, e.g. `"0.0.0.0:8443"`.
    pub bind: String,

    /// Certificates served on this endpoint. More than one entry is allowed
    /// (e.g. an RSA and an ECDSA certificate); the handshake picks a
    /// compatible one.
    #[serde(default)]
    pub certificate: Vec<CertificateConfig>,
}

fn default_endpoint_name() -> String {
    "default".to_string()
}

/// One cert/key pair, as PEM files on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateConfig {
    /// Certificate chain, leaf first.
    pub cert: PathBuf,

    /// Private key (PKCS#8, PKCS#1 or SEC1).
    pub key: PathBuf,
}
