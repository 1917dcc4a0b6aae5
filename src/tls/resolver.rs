// src/tls/resolver.rs

use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::tls::store::{CertSlot, EndpointCerts};

/// Serves whatever each slot currently holds, so a store reload is visible
/// to the very next handshake without rebuilding the `ServerConfig`.
///
/// With multiple slots (e.g. ECDSA and RSA), the first one whose signing key
/// matches a client-offered signature scheme wins; if none matches, the first
/// slot is returned and rustls surfaces the handshake error.
pub struct ReloadableCertResolver {
    slots: Vec<Arc<CertSlot>>,
}

impl ReloadableCertResolver {
    pub fn for_endpoint(endpoint: &EndpointCerts) -> Arc<Self> {
        Arc::new(Self {
            slots: endpoint.slots().to_vec(),
        })
    }
}

impl ResolvesServerCert for ReloadableCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let schemes = client_hello.signature_schemes();

        for slot in &self.slots {
            let key = slot.current();
            if key.key.choose_scheme(schemes).is_some() {
                return Some(key);
            }
        }

        self.slots.first().map(|slot| slot.current())
    }
}

impl std::fmt::Debug for ReloadableCertResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadableCertResolver")
            .field("slots", &self.slots.len())
            .finish()
    }
}
