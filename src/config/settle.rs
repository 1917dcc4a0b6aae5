// src/config/settle.rs

//! The settle delay: how long the reloader waits after the first detected
//! change before re-reading certificates.
//!
//! A smaller value reloads faster; a larger value raises the chance that all
//! cert-related files (cert, chain, key) have been written before the reload,
//! so a consistent set is picked up. ACME-style issuers commonly take several
//! seconds between writing the first and the last file of a renewal.

use std::time::Duration;

use anyhow::{Context, Result};

/// Environment variable overriding the settle delay, in milliseconds.
pub const SETTLE_ENV: &str = "CERTWATCH_RELOAD_SETTLE_MS";

/// Default settle delay when the environment variable is absent.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(3000);

/// Read the settle delay from the environment, once at startup.
///
/// Absent → [`DEFAULT_SETTLE`]. Present but not a valid integer → error
/// (startup fails; a silently-misread delay would be worse).
pub fn settle_delay_from_env() -> Result<Duration> {
    parse_settle_delay(std::env::var(SETTLE_ENV).ok().as_deref())
}

fn parse_settle_delay(raw: Option<&str>) -> Result<Duration> {
    match raw {
        None => Ok(DEFAULT_SETTLE),
        Some(s) => {
            let millis: u64 = s
                .trim()
                .parse()
                .with_context(|| format!("{SETTLE_ENV} must be an integer (got '{s}')"))?;
            Ok(Duration::from_millis(millis))
        }
    }
}
