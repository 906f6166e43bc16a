use crate::error::EngineError;
use crate::mutation::DEFAULT_MUTATION_RATE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BRANCH_LENGTH: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub threshold_file: PathBuf,
    pub fasta_dir: PathBuf,
    pub tree_file: PathBuf,
}

impl DataPaths {
    pub fn under(data_dir: &Path) -> Self {
        Self {
            threshold_file: data_dir.join("threshold.json"),
            fasta_dir: data_dir.join("gen_fasta"),
            tree_file: data_dir.join("BEE_prunedtree_APIS.nwk"),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::under(Path::new(DEFAULT_DATA_DIR))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub mutation_rate: f64,
    pub branch_length: f64,
    /// Fixed seed for reproducible runs; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            mutation_rate: DEFAULT_MUTATION_RATE,
            branch_length: DEFAULT_BRANCH_LENGTH,
            seed: None,
        }
    }
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EngineError::configuration(format!(
                "mutation_rate must be within [0, 1], got {}",
                self.mutation_rate
            )));
        }
        if !self.branch_length.is_finite() || self.branch_length < 0.0 {
            return Err(EngineError::configuration(format!(
                "branch_length must be a non-negative number, got {}",
                self.branch_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcobeeConfig {
    pub data: DataPaths,
    pub simulation: SimulationParameters,
}

impl EcobeeConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!(
                "Could not read config file '{}': {e}",
                path.display()
            ))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            EngineError::configuration(format!(
                "Could not parse config JSON '{}': {e}",
                path.display()
            ))
        })?;
        config.simulation.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), EngineError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::internal(format!("Could not serialize config: {e}")))?;
        std::fs::write(path, text).map_err(|e| {
            EngineError::configuration(format!(
                "Could not write config file '{}': {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let td = tempdir().unwrap();
        let path = td.path().join("ecobee.json");
        std::fs::write(&path, r#"{"simulation": {"seed": 9}}"#).unwrap();
        let config = EcobeeConfig::load_from_path(&path).unwrap();
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.simulation.mutation_rate, 0.05);
        assert_eq!(config.simulation.branch_length, 0.1);
        assert_eq!(config.data.tree_file, PathBuf::from("data/BEE_prunedtree_APIS.nwk"));
    }

    #[test]
    fn test_rejects_bad_rate() {
        let td = tempdir().unwrap();
        let path = td.path().join("ecobee.json");
        std::fs::write(&path, r#"{"simulation": {"mutation_rate": 1.5}}"#).unwrap();
        let err = EcobeeConfig::load_from_path(&path).unwrap_err();
        assert!(err.message.contains("mutation_rate"));
    }

    #[test]
    fn test_save_and_reload() {
        let td = tempdir().unwrap();
        let path = td.path().join("ecobee.json");
        let mut config = EcobeeConfig::default();
        config.data = DataPaths::under(Path::new("/srv/ecobee"));
        config.save_to_path(&path).unwrap();
        assert_eq!(EcobeeConfig::load_from_path(&path).unwrap(), config);
    }
}
