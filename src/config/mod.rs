// src/config/mod.rs

//! Configuration loading and validation for certwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like bind addresses (`validate.rs`).
//! - Read the settle delay from the environment (`settle.rs`).

pub mod loader;
pub mod model;
pub mod settle;
pub mod validate;

use std::path::{Path, PathBuf};

pub use loader::{config_base_dir, load_and_validate, load_from_path};
pub use model::{CertificateConfig, ConfigFile, EndpointConfig};
pub use settle::{DEFAULT_SETTLE, SETTLE_ENV, settle_delay_from_env};
pub use validate::validate_config;

/// Resolve a possibly-relative path against the config base directory.
///
/// This is the single path-resolution rule in the crate: the certificate
/// store and the watch-target derivation both go through it, so the watched
/// directory always matches the directory certificates are read from.
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
