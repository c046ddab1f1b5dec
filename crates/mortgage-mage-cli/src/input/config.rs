use mortgage_mage_core::config::EngineConfig;
use tracing::debug;

use super::document;

/// Engine configuration from `--config`, or defaults when none is given.
pub fn load_engine_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config: EngineConfig = match path {
        Some(p) => document::load(p)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    debug!(path = path.unwrap_or("<defaults>"), "loaded engine config");
    Ok(config)
}
