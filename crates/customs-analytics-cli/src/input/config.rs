use customs_analytics_core::AnalysisConfig;

use super::file;

/// Load the analysis configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&str>) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = file::read_text(path)?;
    let config = if file::has_extension(path, &["yaml", "yml"]) {
        let config: AnalysisConfig = serde_yaml::from_str(&text)
            .map_err(|e| format!("Failed to parse '{}': {}", path, e))?;
        config.validate()?;
        config
    } else {
        AnalysisConfig::from_json_str(&text)?
    };
    log::debug!("configuration loaded from {}", path);
    Ok(config)
}
