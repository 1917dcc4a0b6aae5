// src/config/validate.rs

use std::collections::HashSet;
use std::net::SocketAddr;

use anyhow::{Result, anyhow};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - every `bind` parses as a socket address
/// - endpoint names are unique
/// - every endpoint has at least one certificate (an endpoint without one
///   could never complete a handshake)
/// - certificate entries have non-empty paths
///
/// It does **not** check that the certificate files exist or parse; that
/// happens when the certificate store loads them.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    let mut seen = HashSet::new();

    for ep in &cfg.endpoint {
        if !seen.insert(ep.name.as_str()) {
            return Err(anyhow!("duplicate endpoint name '{}'", ep.name));
        }

        ep.bind.parse::<SocketAddr>().map_err(|e| {
            anyhow!(
                "endpoint '{}' has invalid bind address '{}': {}",
                ep.name,
                ep.bind,
                e
            )
        })?;

        if ep.certificate.is_empty() {
            return Err(anyhow!(
                "endpoint '{}' must have at least one [[endpoint.certificate]]",
                ep.name
            ));
        }

        for cert in &ep.certificate {
            if cert.cert.as_os_str().is_empty() {
                return Err(anyhow!("endpoint '{}' has an empty `cert` path", ep.name));
            }
            if cert.key.as_os_str().is_empty() {
                return Err(anyhow!("endpoint '{}' has an empty `key` path", ep.name));
            }
        }
    }

    Ok(())
}
