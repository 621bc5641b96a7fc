//! Package manifest lookup.
//!
//! Applications managed by PM2 are usually Node packages; their `package.json`
//! carries the version we tag events with. Absence is normal and never an error.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

/// Manifest file name looked up in a process working directory.
pub const MANIFEST_FILE: &str = "package.json";

#[derive(Deserialize)]
struct Manifest {
    version: Option<String>,
}

/// Reads the `version` field of `<dir>/package.json`.
///
/// Returns `None` when the file is missing, unreadable, not JSON, or has no
/// string `version`.
pub async fn read_version(dir: &Path) -> Option<String> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable manifest");
            return None;
        }
    };
    match serde_json::from_slice::<Manifest>(&bytes) {
        Ok(manifest) => manifest.version.filter(|v| !v.is_empty()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "manifest is not valid JSON");
            None
        }
    }
}
