// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod server;
pub mod tls;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::{config_base_dir, load_and_validate};
use crate::config::model::ConfigFile;
use crate::tls::CertStore;
use crate::watch::ReloadCertificates;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the reloadable certificate store
/// - one TLS accept loop per endpoint
/// - the certificate watch/reload workers
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let base_dir = config_base_dir(&config_path);

    // Read once at startup; a malformed override fails startup rather than
    // silently running with a surprising delay.
    let settle = config::settle_delay_from_env()?;

    if args.dry_run {
        print_dry_run(&cfg, settle);
        return Ok(());
    }

    let store = Arc::new(CertStore::load(&cfg, &base_dir)?);
    server::spawn_endpoints(&cfg, &store).await?;

    // Only once the endpoints are up: start watching for renewals. Failures
    // inside disable live reload but never the listeners.
    watch::spawn_certificate_watch(
        Arc::new(cfg),
        base_dir,
        Arc::clone(&store) as Arc<dyn ReloadCertificates>,
        settle,
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, stopping");
    Ok(())
}

/// Simple dry-run output: print endpoints, certificates and the settle delay.
fn print_dry_run(cfg: &ConfigFile, settle: std::time::Duration) {
    println!("certwatch dry-run");
    println!("  reload settle delay = {}ms", settle.as_millis());
    println!();

    println!("endpoints ({}):", cfg.endpoint.len());
    for ep in &cfg.endpoint {
        println!("  - {} on {}", ep.name, ep.bind);
        for cert in &ep.certificate {
            println!("      cert: {}", cert.cert.display());
            println!("      key:  {}", cert.key.display());
        }
    }
}
