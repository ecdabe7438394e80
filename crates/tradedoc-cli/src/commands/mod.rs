pub mod batch;
pub mod config;
pub mod extract;
pub mod merge;
pub mod process;

use std::path::Path;

use tracing::debug;

use tradedoc_core::models::config::TradeDocConfig;

/// Load the configuration from `path`, else from the default location if a
/// file exists there, else the built-in defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<TradeDocConfig> {
    if let Some(path) = path {
        return Ok(TradeDocConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        return Ok(TradeDocConfig::from_file(&default_path)?);
    }

    Ok(TradeDocConfig::default())
}
