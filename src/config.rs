use crate::error::{Error, Result};
use crate::loader::LoadOptions;
use crate::pipeline::PipelineOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings for one dashboard session. Every field has a default, so a
/// config file only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// How many salesmen to show at each end of the leaderboard.
    pub top_n: usize,
    pub pipeline: PipelineOptions,
    pub load: LoadOptions,
    /// Initial filter; the interactive menu can change it afterwards.
    pub states: Vec<String>,
    pub salesmen: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            input: PathBuf::from("sales_data.csv"),
            output_dir: PathBuf::from("."),
            top_n: 5,
            pipeline: PipelineOptions::default(),
            load: LoadOptions::default(),
            states: Vec::new(),
            salesmen: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("using config {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(Error::Config("top_n must be at least 1".to_string()));
        }
        let t = self.pipeline.support_threshold_pct;
        if !t.is_finite() || t < 0.0 {
            return Err(Error::Config(format!(
                "support threshold must be a non-negative percentage, got {}",
                t
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = DashboardConfig::from_json_str(
            r#"{ "top_n": 3, "load": { "drop_duplicates": true }, "states": ["Goa"] }"#,
        )
        .unwrap();
        assert_eq!(cfg.top_n, 3);
        assert!(cfg.load.drop_duplicates);
        assert!(!cfg.load.exclude_conflicting_states);
        assert_eq!(cfg.pipeline.support_threshold_pct, 60.0);
        assert_eq!(cfg.input, PathBuf::from("sales_data.csv"));
        assert_eq!(cfg.states, vec!["Goa".to_string()]);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{ "top_n": 0 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{ "pipeline": { "support_threshold_pct": -5 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json_str("not json"),
            Err(Error::Json(_))
        ));
    }
}
