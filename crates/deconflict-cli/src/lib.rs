//! Command-line front end for the deconfliction engine.

pub mod config;
pub mod loader;
pub mod summary;

use anyhow::Result;
use deconflict_core::{ConflictDetector, ConflictReport, DetectionConfig};
use std::path::Path;

/// Log filter used when `RUST_LOG` is unset; covers the binary, this crate and the engine.
pub const DEFAULT_LOG_DIRECTIVES: &str = "deconflict=info,deconflict_cli=info,deconflict_core=info";

/// Load both mission files and run detection.
pub fn check_files(
    primary: &Path,
    traffic: &Path,
    config: &DetectionConfig,
) -> Result<ConflictReport> {
    let primary = loader::load_primary(primary)?;
    let traffic = loader::load_traffic(traffic)?;
    let detector = ConflictDetector::new(config.clone())?;
    Ok(detector.detect(&primary, &traffic)?)
}
