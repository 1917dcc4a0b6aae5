// src/server.rs

//! Per-endpoint TLS accept loops.
//!
//! Intentionally minimal: each connection gets a TLS handshake through the
//! reloadable resolver and a fixed HTTP response. The point of the binary is
//! watching certificate renewals land on a live listener, not serving an
//! application.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustls::ServerConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::tls::{CertStore, ReloadableCertResolver};

/// Bind and spawn one accept loop per configured endpoint.
///
/// Bind failures are fatal to startup; everything after that is per-connection
/// and only logged.
pub async fn spawn_endpoints(config: &ConfigFile, store: &CertStore) -> Result<()> {
    for (ep_cfg, ep_certs) in config.endpoint.iter().zip(store.endpoints()) {
        let addr: SocketAddr = ep_cfg
            .bind
            .parse()
            .with_context(|| format!("parsing bind address for endpoint '{}'", ep_cfg.name))?;

        let resolver = ReloadableCertResolver::for_endpoint(ep_certs);
        let tls_config = Arc::new(server_config(resolver)?);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding endpoint '{}' on {}", ep_cfg.name, addr))?;

        info!(endpoint = %ep_cfg.name, addr = %addr, "tls endpoint listening");

        let acceptor = TlsAcceptor::from(tls_config);
        let name = ep_cfg.name.clone();
        tokio::spawn(accept_loop(listener, acceptor, name));
    }

    Ok(())
}

/// Build a `ServerConfig` whose certificates come from the reloadable
/// resolver instead of a fixed chain.
pub fn server_config(resolver: Arc<ReloadableCertResolver>) -> Result<ServerConfig> {
    let provider = rustls::crypto::ring::default_provider();
    let config = ServerConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .context("building TLS protocol configuration")?
        .with_no_client_auth()
        .with_cert_resolver(resolver);
    Ok(config)
}

async fn accept_loop(listener: TcpListener, acceptor: TlsAcceptor, endpoint: String) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                debug!(endpoint = %endpoint, error = %err, "accept failed");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, acceptor).await {
                // Scanners and misconfigured clients make handshake failures
                // routine; keep them out of the default log level.
                debug!(endpoint = %endpoint, peer = %peer, error = %err, "connection failed");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, acceptor: TlsAcceptor) -> Result<()> {
    let mut tls = acceptor.accept(stream).await.context("tls handshake")?;

    // Drain whatever request line arrives, then answer with a fixed response.
    let mut buf = [0u8; 1024];
    let _ = tls.read(&mut buf).await;

    const BODY: &str = "certwatch: ok\n";
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        BODY.len(),
        BODY
    );
    tls.write_all(response.as_bytes()).await?;
    tls.shutdown().await?;
    Ok(())
}
