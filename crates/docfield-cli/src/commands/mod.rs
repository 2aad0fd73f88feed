//! Sub-command implementations.

pub mod batch;
pub mod config;
pub mod process;
pub mod recover;

use std::path::Path;
use std::time::Duration;

use docfield_core::{DocfieldConfig, HttpBackend};
use tracing::debug;

/// Load the explicit config file, else the per-user one, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<DocfieldConfig> {
    if let Some(path) = config_path {
        return DocfieldConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(DocfieldConfig::from_file(&default_path)?)
    } else {
        Ok(DocfieldConfig::default())
    }
}

/// HTTP backend for the configured endpoint.
pub fn http_backend(config: &DocfieldConfig) -> anyhow::Result<HttpBackend> {
    HttpBackend::with_connect_timeout(config.inference.endpoint.clone(), config.connect_timeout())
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

/// Milliseconds of a duration, for display.
pub fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
