/// Client configuration loading for the CLI

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tabkv_core::ClientConfig;

/// Load a `ClientConfig` from a JSON file, or defaults when no file is given.
///
/// Fields missing from the file keep their default values.
pub fn load_client_config(path: Option<&Path>) -> Result<ClientConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<ClientConfig>(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    config
        .validate()
        .map_err(|e| anyhow!("Invalid client configuration: {}", e))?;
    Ok(config)
}
