use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The parts of a Google service account key file needed to mint tokens
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Write the service account JSON supplied through the environment to `path`.
///
/// Returns false (and leaves any existing file alone) when no contents were given.
pub fn materialize_service_account(contents: Option<&str>, path: &Path) -> Result<bool> {
    let Some(contents) = contents else {
        return Ok(false);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write service account file {}", path.display()))?;

    log::info!("🔑 Service account credentials written to {}", path.display());
    Ok(true)
}

pub fn load_service_account(path: &Path) -> Result<ServiceAccountKey> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read service account file {}", path.display()))?;
    let key: ServiceAccountKey = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid service account file {}", path.display()))?;

    log::debug!("🔑 Loaded service account {}", key.client_email);
    Ok(key)
}
