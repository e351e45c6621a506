//! Run configuration files.

use std::fs;
use std::path::Path;

use crate::domain::PipelineConfig;
use crate::error::AppError;

/// Read a `PipelineConfig` from a JSON file.
pub fn read_config_json(path: &Path) -> Result<PipelineConfig, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
    parse_config_json(&text)
        .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))
}

pub fn parse_config_json(text: &str) -> Result<PipelineConfig, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtest_can_be_disabled() {
        let cfg = parse_config_json(
            r#"{
                "summary": { "trend_end_year": 2019 },
                "forecast": { "expected_cutoff": "2019-12-31", "robust": "huber" },
                "backtest": null,
                "location_overrides": { "Morse": { "latitude": 42.0, "longitude": -87.6 } }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.backtest, None);
        assert_eq!(cfg.forecast.robust, crate::domain::RobustKind::Huber);
        assert_eq!(cfg.location_overrides.len(), 1);
    }

    #[test]
    fn missing_file_maps_to_exit_code_2() {
        let err = read_config_json(Path::new("/nonexistent/ridership.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
