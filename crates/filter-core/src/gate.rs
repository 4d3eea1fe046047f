// Input Filter Safety Gate
// Startup check that must pass before any device is touched

use std::path::{Path, PathBuf};

/// Flag file whose presence permits interception on the head unit
pub const DEFAULT_FLAG_FILE: &str = "/tmp/mnt/data/enable_input_filter";

/// "Is interception permitted on this host right now?"
pub trait SafetyGate {
    fn permits(&self) -> bool;

    /// Human-readable description for diagnostics
    fn describe(&self) -> String;
}

/// Permits interception only while a flag file exists
///
/// Removing the file (e.g. from a recovery shell) keeps the filter from
/// starting on the next boot.
#[derive(Debug, Clone)]
pub struct FlagFileGate {
    path: PathBuf,
}

impl FlagFileGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FlagFileGate {
    fn default() -> Self {
        Self::new(DEFAULT_FLAG_FILE)
    }
}

impl SafetyGate for FlagFileGate {
    fn permits(&self) -> bool {
        self.path.exists()
    }

    fn describe(&self) -> String {
        format!("flag file {}", self.path.display())
    }
}

/// Always permits; for development hosts only
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl SafetyGate for OpenGate {
    fn permits(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "gate disabled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_file_gate_follows_file() {
        let path = std::env::temp_dir().join(format!("input-filter-gate-{}", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let gate = FlagFileGate::new(&path);
        assert!(!gate.permits());

        std::fs::write(&path, b"").unwrap();
        assert!(gate.permits());

        std::fs::remove_file(&path).unwrap();
        assert!(!gate.permits());
    }

    #[test]
    fn test_default_flag_file() {
        assert_eq!(FlagFileGate::default().path(), Path::new(DEFAULT_FLAG_FILE));
        assert!(FlagFileGate::default().describe().contains("enable_input_filter"));
    }

    #[test]
    fn test_open_gate() {
        assert!(OpenGate.permits());
    }
}
