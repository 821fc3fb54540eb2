use crate::builder::OperatingResultPolicy;
use crate::error::Result;
use crate::labels::LabelCatalog;
use crate::locator::LocatorConfig;
use crate::period::PeriodTerms;
use crate::scoring::ScorePolicy;
use crate::segmenter::SegmentationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything an analyzer needs besides the document. Every part is optional in
/// JSON and falls back to the Brazilian defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub segmentation: SegmentationConfig,
    pub catalog: LabelCatalog,
    pub score_policy: ScorePolicy,
    pub locator: LocatorConfig,
    pub operating_result: OperatingResultPolicy,
    pub period_terms: PeriodTerms,
}

impl AnalyzerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        self.catalog.validate()?;
        self.score_policy.validate()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatementAnalysisError;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = AnalyzerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.score_policy.version, "v7");
        assert_eq!(config.locator.max_lookahead_lines, 3);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "segmentation": { "balance_sheet_end": 0.7 },
            "operating_result": "PreferLocated"
        }"#;
        let config = AnalyzerConfig::from_json_str(json).unwrap();
        assert_eq!(config.segmentation.balance_sheet_end, 0.7);
        assert_eq!(config.segmentation.income_statement_start, 0.4);
        assert_eq!(config.operating_result, OperatingResultPolicy::PreferLocated);
    }

    #[test]
    fn test_invalid_segmentation_rejected() {
        let json = r#"{ "segmentation": { "balance_sheet_end": 0.3, "income_statement_start": 0.5 } }"#;
        let err = AnalyzerConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, StatementAnalysisError::InvalidSegmentation(_)));
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!(
            "statement_analyzer_config_{}.json",
            std::process::id()
        ));
        let config = AnalyzerConfig::default();
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = AnalyzerConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AnalyzerConfig::from_path("/nonexistent/analyzer.json").unwrap_err();
        assert!(matches!(err, StatementAnalysisError::IoError(_)));
    }
}
