//! Dashboard configuration, read from an optional JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::aggregate::{Pipeline, ROLLING_WINDOW};
use crate::data::model::{MAIN_CAST, Roster};
use crate::error::{DashboardError, DashboardResult};

/// Dataset location used when neither the CLI nor the config names one.
pub const DEFAULT_DATASET: &str = "critrole_c2_cleaned.csv";

/// Settings that stay fixed for the lifetime of the process.
///
/// ```json
/// { "dataset": "rolls.parquet", "roster": ["Beau", "Fjord"], "rolling_window": 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub dataset: PathBuf,
    /// Main characters; everyone else is a guest.
    pub roster: Vec<String>,
    /// Image shown at the top of the side panel.
    pub logo: Option<PathBuf>,
    /// Window of the centered rolling mean over rolls per episode.
    pub rolling_window: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from(DEFAULT_DATASET),
            roster: MAIN_CAST.iter().map(|s| s.to_string()).collect(),
            logo: None,
            rolling_window: ROLLING_WINDOW,
        }
    }
}

impl DashboardConfig {
    /// Read a config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> DashboardResult<Self> {
        let invalid = |reason: String| DashboardError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let config: DashboardConfig =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        if config.rolling_window == 0 {
            return Err(invalid("rolling_window must be at least 1".into()));
        }
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override the dataset location.
    pub fn with_dataset(mut self, dataset: impl Into<PathBuf>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn roster(&self) -> Roster {
        Roster::new(self.roster.iter().cloned())
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline {
            roster: self.roster(),
            rolling_window: self.rolling_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_config() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.dataset, PathBuf::from(DEFAULT_DATASET));
        assert_eq!(cfg.roster().len(), 8);
        assert_eq!(cfg.rolling_window, 7);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_config(r#"{ "roster": ["Pike", "Vex"] }"#);
        let cfg = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(cfg.dataset, PathBuf::from(DEFAULT_DATASET));
        assert!(cfg.roster().contains("Pike"));
        assert!(!cfg.roster().contains("Beau"));
        assert_eq!(cfg.pipeline().rolling_window, 7);
    }

    #[test]
    fn zero_window_is_rejected() {
        let file = write_config(r#"{ "rolling_window": 0 }"#);
        let err = DashboardConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, DashboardError::Config { .. }));
    }

    #[test]
    fn malformed_file_is_rejected() {
        let file = write_config("{ roster: ");
        assert!(DashboardConfig::load(file.path()).is_err());
    }

    #[test]
    fn dataset_override() {
        let cfg = DashboardConfig::default().with_dataset("rolls.parquet");
        assert_eq!(cfg.dataset, PathBuf::from("rolls.parquet"));
    }
}
