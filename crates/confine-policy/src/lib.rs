//! Declarative sandbox policy documents for confine.
//!
//! This crate defines the schema layer: the parsed policy document
//! (`PolicyDocument`) with its closed field enums (`RunMode`, `LogLevel`,
//! `RlimitMode`), proto-faithful defaults, and the TOML front-end
//! (`parse_policy_str` / `parse_policy_file`). Semantic resolution of a
//! document into an execution plan lives in `confine-plan`.

pub mod document;

pub use document::{
    ExecBin, IdMapEntry, LogLevel, MountEntry, PolicyDocument, RlimitMode, RunMode,
};

use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse policy: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parse a policy document from TOML text.
///
/// Closed-set fields (`mode`, `log_level`, `rlimit_*_type`) reject unknown
/// values here, naming the offending value in the error. Unknown document
/// keys are rejected as well.
pub fn parse_policy_str(input: &str) -> Result<PolicyDocument, PolicyError> {
    Ok(toml::from_str(input)?)
}

/// Read and parse a policy document from a file.
pub fn parse_policy_file(path: impl AsRef<Path>) -> Result<PolicyDocument, PolicyError> {
    let path = path.as_ref();
    info!("parsing policy from {}", path.display());
    let content = fs::read_to_string(path)?;
    match parse_policy_str(&content) {
        Ok(doc) => {
            if let Ok(json) = serde_json::to_string(&doc) {
                debug!("parsed policy: {json}");
            }
            Ok(doc)
        }
        Err(e) => {
            warn!("could not parse policy file {}: {e}", path.display());
            Err(e)
        }
    }
}
