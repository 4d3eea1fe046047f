// Input Filter Setup Errors
// Everything that can abort device substitution

use super::substitution::SubstitutionStage;
use std::io;
use std::path::PathBuf;

/// Result type for startup operations
pub type SetupResult<T> = Result<T, SetupError>;

/// Startup failures. All of them are fatal; none are rolled back.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Interception not permitted: {0}")]
    NotPermitted(String),

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Failed to open source device {}: {source}", .path.display())]
    OpenSource { path: PathBuf, source: io::Error },

    #[error("Failed to create decoy device {index}: {source}")]
    Decoy { index: usize, source: io::Error },

    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] io::Error),

    #[error("Target node {} exists before creating the virtual device", .0.display())]
    TargetPreexisting(PathBuf),

    #[error("Virtual device node {} did not appear", .0.display())]
    NodeMissing(PathBuf),

    #[error("Failed to locate virtual device node: {0}")]
    Locate(String),

    #[error("Node {} failed verification: {reason}", .path.display())]
    Verification { path: PathBuf, reason: String },

    #[error("Failed to unlink source device {}: {source}", .path.display())]
    Unlink { path: PathBuf, source: io::Error },

    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Substitution cannot move from {from} to {to}")]
    StageOrder {
        from: SubstitutionStage,
        to: SubstitutionStage,
    },
}
