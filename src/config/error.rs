//! Configuration error types.
//!
//! All of these are fatal and raised before any build or watch activity
//! starts. An invalid role map discovered only after loading the bundle
//! into a browser is exactly the failure mode this crate exists to avoid.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("manifest parsing error")]
    Json(#[from] serde_json::Error),

    #[error("manifest declares no background scripts; background.scripts is required")]
    MissingBackground,

    #[error("no build entry matches role `{0}`")]
    EntryResolution(String),

    #[error("one of `entries` or `manifest` must be configured")]
    MissingRoles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("manifest.json"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("manifest.json"));

        let entry_err = ConfigError::EntryResolution("bg".to_string());
        assert!(format!("{entry_err}").contains("bg"));
    }
}
