// src/tls/store.rs

//! The reloadable certificate store.
//!
//! Each configured cert/key pair gets one [`CertSlot`]: the resolved file
//! paths plus the currently-served `CertifiedKey` behind an atomic pointer
//! swap. Handshakes in flight keep the `Arc` they resolved; handshakes
//! accepted after a swap see the new material. That is the whole extent of
//! "atomic" here; there is no cross-slot transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use rustls::sign::CertifiedKey;
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::config::resolve_path;
use crate::tls::pem;
use crate::watch::ReloadCertificates;

/// One cert/key pair's serving state.
pub struct CertSlot {
    cert_path: PathBuf,
    key_path: PathBuf,
    current: ArcSwap<CertifiedKey>,
}

impl CertSlot {
    /// Read the pair from disk and build the initial serving state.
    fn load(cert_path: PathBuf, key_path: PathBuf) -> Result<Self> {
        let key = read_certified_key(&cert_path, &key_path)?;
        Ok(Self {
            cert_path,
            key_path,
            current: ArcSwap::from_pointee(key),
        })
    }

    /// The currently-served certificate.
    pub fn current(&self) -> Arc<CertifiedKey> {
        self.current.load_full()
    }

    fn read_fresh(&self) -> Result<CertifiedKey> {
        read_certified_key(&self.cert_path, &self.key_path)
    }
}

impl std::fmt::Debug for CertSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertSlot")
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .finish()
    }
}

fn read_certified_key(cert_path: &Path, key_path: &Path) -> Result<CertifiedKey> {
    let chain = pem::load_certs(cert_path)?;
    let key_der = pem::load_private_key(key_path)?;
    let key = rustls::crypto::ring::sign::any_supported_type(&key_der)
        .with_context(|| format!("unsupported private key in {}", key_path.display()))?;
    Ok(CertifiedKey::new(chain, key))
}

/// All certificate slots of one endpoint.
#[derive(Debug)]
pub struct EndpointCerts {
    pub name: String,
    slots: Vec<Arc<CertSlot>>,
}

impl EndpointCerts {
    pub fn slots(&self) -> &[Arc<CertSlot>] {
        &self.slots
    }
}

/// Every endpoint's certificate material, loaded once at startup and
/// re-readable as a whole. Implements the reload capability the watch
/// subsystem invokes.
#[derive(Debug)]
pub struct CertStore {
    endpoints: Vec<EndpointCerts>,
}

impl CertStore {
    /// Load all configured certificates. Any unreadable or unparsable entry
    /// fails the whole load; this runs at process startup where a broken
    /// certificate set should be fatal.
    pub fn load(config: &ConfigFile, base_dir: &Path) -> Result<Self> {
        let mut endpoints = Vec::with_capacity(config.endpoint.len());

        for ep in &config.endpoint {
            let mut slots = Vec::with_capacity(ep.certificate.len());
            for cert in &ep.certificate {
                let cert_path = resolve_path(base_dir, &cert.cert);
                let key_path = resolve_path(base_dir, &cert.key);
                let slot = CertSlot::load(cert_path, key_path)
                    .with_context(|| format!("loading certificate for endpoint '{}'", ep.name))?;
                slots.push(Arc::new(slot));
            }
            endpoints.push(EndpointCerts {
                name: ep.name.clone(),
                slots,
            });
        }

        Ok(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[EndpointCerts] {
        &self.endpoints
    }

    /// Re-read every slot of every endpoint and swap in the fresh material.
    ///
    /// Per endpoint, all files are read before any slot is swapped, so a
    /// half-written renewal burst fails the attempt and leaves the previous
    /// material serving. The caller (the debounced reloader) treats failure
    /// as "try again on the next filesystem event".
    pub fn reload_all(&self) -> Result<()> {
        for ep in &self.endpoints {
            let fresh: Vec<CertifiedKey> = ep
                .slots
                .iter()
                .map(|slot| slot.read_fresh())
                .collect::<Result<_>>()
                .with_context(|| format!("reloading certificates for endpoint '{}'", ep.name))?;

            for (slot, key) in ep.slots.iter().zip(fresh) {
                slot.current.store(Arc::new(key));
            }
            debug!(
                endpoint = %ep.name,
                certificates = ep.slots.len(),
                "applied fresh certificates"
            );
        }
        Ok(())
    }
}

impl ReloadCertificates for CertStore {
    fn reload(&self) -> Result<()> {
        self.reload_all()
    }
}
