// src/watch/mod.rs

//! Watch-and-reload coordination.
//!
//! This module is responsible for:
//! - Deriving the watched directory from the TLS endpoint configuration
//!   (first endpoint, first certificate, parent directory).
//! - Wiring up a cross-platform filesystem watcher (`notify`) on it.
//! - Debouncing change bursts into exactly one reload call each.
//!
//! It does **not** know how certificates are parsed or served; it only turns
//! filesystem changes into invocations of a [`ReloadCertificates`] capability
//! supplied by the host TLS stack.

pub mod pending;
pub mod reloader;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::error;

use crate::config::model::ConfigFile;
use crate::config::resolve_path;

pub use pending::PendingChange;
pub use reloader::DebouncedReloader;
pub use watcher::DirectoryWatcher;

/// Capability to re-read and re-apply all certificate material for all
/// endpoints. Supplied by the host TLS stack; may fail (e.g. while an
/// issuance burst is mid-write) and failure is non-fatal to the watcher.
pub trait ReloadCertificates: Send + Sync + 'static {
    fn reload(&self) -> Result<()>;
}

/// Startup hook: start watching the certificate directory and reloading on
/// change. Invoked once after the TLS endpoints are otherwise fully
/// initialized; spawns the workers and returns immediately.
///
/// Failures here (missing configuration, missing directory, registration
/// error) disable live reload only: they are logged and the rest of the
/// process keeps serving with the certificates it already has.
pub fn spawn_certificate_watch(
    config: Arc<ConfigFile>,
    base_dir: PathBuf,
    reload: Arc<dyn ReloadCertificates>,
    settle: Duration,
) {
    tokio::spawn(async move {
        let dir = match watch_target(&config, &base_dir) {
            Ok(dir) => dir,
            Err(err) => {
                error!(error = %err, "cannot watch for certificate changes");
                return;
            }
        };
        if let Err(err) = watch_directory(dir, reload, settle) {
            error!(error = %err, "cannot watch for certificate changes");
        }
    });
}

/// Start the watcher/reloader pair on an already-resolved directory.
///
/// Split out from [`spawn_certificate_watch`] so the pipeline can be driven
/// against any directory and reload capability.
pub fn watch_directory(
    dir: PathBuf,
    reload: Arc<dyn ReloadCertificates>,
    settle: Duration,
) -> Result<()> {
    let pending = Arc::new(PendingChange::new());
    DirectoryWatcher::new(dir, Arc::clone(&pending)).start()?;
    DebouncedReloader::new(settle, pending, reload).spawn();
    Ok(())
}

/// Resolve the directory to watch: the parent directory of the first
/// endpoint's first certificate, using the same path-resolution rule the TLS
/// stack itself uses for relative paths.
///
/// Only the simplest topology is supported: one watched directory feeding one
/// reloadable configuration. Additional endpoints and certificates are still
/// reloaded, they just do not contribute watch targets.
pub fn watch_target(config: &ConfigFile, base_dir: &Path) -> Result<PathBuf> {
    let endpoint = config
        .endpoint
        .first()
        .ok_or_else(|| anyhow!("no TLS endpoint configured"))?;

    let certificate = endpoint
        .certificate
        .first()
        .ok_or_else(|| anyhow!("endpoint '{}' has no certificate configured", endpoint.name))?;

    let cert_path = resolve_path(base_dir, &certificate.cert);
    let dir = cert_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            anyhow!(
                "certificate path {} has no parent directory",
                cert_path.display()
            )
        })?;

    if !dir.is_dir() {
        return Err(anyhow!(
            "certificate directory {} does not exist",
            dir.display()
        ));
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::watch_target;
    use crate::config::model::{CertificateConfig, ConfigFile, EndpointConfig};

    fn config_with(cert: &str, key: &str) -> ConfigFile {
        ConfigFile {
            endpoint: vec![EndpointConfig {
                name: "default".into(),
                bind: "127.0.0.1:8443".into(),
                certificate: vec![CertificateConfig {
                    cert: PathBuf::from(cert),
                    key: PathBuf::from(key),
                }],
            }],
        }
    }

    #[test]
    fn derives_parent_of_first_certificate() {
        let tmp = TempDir::new().unwrap();
        let certs = tmp.path().join("certs");
        std::fs::create_dir(&certs).unwrap();

        let cfg = config_with("certs/fullchain.pem", "certs/privkey.pem");
        let dir = watch_target(&cfg, tmp.path()).unwrap();
        assert_eq!(dir, certs);
    }

    #[test]
    fn absolute_certificate_paths_are_used_verbatim() {
        let tmp = TempDir::new().unwrap();
        let cert = tmp.path().join("fullchain.pem");

        let cfg = config_with(cert.to_str().unwrap(), "privkey.pem");
        let dir = watch_target(&cfg, &PathBuf::from("/nonexistent-base")).unwrap();
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn missing_endpoint_is_an_error() {
        let cfg = ConfigFile { endpoint: vec![] };
        let err = watch_target(&cfg, &PathBuf::from(".")).unwrap_err();
        assert!(err.to_string().contains("no TLS endpoint"));
    }

    #[test]
    fn missing_certificate_is_an_error() {
        let cfg = ConfigFile {
            endpoint: vec![EndpointConfig {
                name: "default".into(),
                bind: "127.0.0.1:8443".into(),
                certificate: vec![],
            }],
        };
        let err = watch_target(&cfg, &PathBuf::from(".")).unwrap_err();
        assert!(err.to_string().contains("no certificate"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let cfg = config_with("gone/fullchain.pem", "gone/privkey.pem");
        let err = watch_target(&cfg, &PathBuf::from("/nonexistent-base")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
