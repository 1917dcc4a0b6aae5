// src/tls/pem.rs

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

/// Read a PEM certificate chain, leaf first.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("opening certificate file {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<_, _>>()
        .with_context(|| format!("parsing PEM certificates from {}", path.display()))?;

    if certs.is_empty() {
        return Err(anyhow!("no certificates found in {}", path.display()));
    }
    Ok(certs)
}

/// Read a PEM private key (PKCS#8, PKCS#1 or SEC1).
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .with_context(|| format!("opening private key file {}", path.display()))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .with_context(|| format!("parsing PEM private key from {}", path.display()))?
        .ok_or_else(|| anyhow!("no private key found in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::{load_certs, load_private_key};

    fn generated_pems() -> (String, String) {
        let generated =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        (
            generated.cert.pem(),
            generated.signing_key.serialize_pem(),
        )
    }

    #[test]
    fn loads_generated_cert_and_key() {
        let (cert_pem, key_pem) = generated_pems();

        let mut cert_file = NamedTempFile::new().unwrap();
        cert_file.write_all(cert_pem.as_bytes()).unwrap();
        let mut key_file = NamedTempFile::new().unwrap();
        key_file.write_all(key_pem.as_bytes()).unwrap();

        let certs = load_certs(cert_file.path()).unwrap();
        assert_eq!(certs.len(), 1);
        load_private_key(key_file.path()).unwrap();
    }

    #[test]
    fn empty_file_is_an_error() {
        let cert_file = NamedTempFile::new().unwrap();
        let err = load_certs(cert_file.path()).unwrap_err();
        assert!(err.to_string().contains("no certificates"));

        let key_file = NamedTempFile::new().unwrap();
        let err = load_private_key(key_file.path()).unwrap_err();
        assert!(err.to_string().contains("no private key"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_certs(std::path::Path::new("/nonexistent/cert.pem")).is_err());
    }
}
