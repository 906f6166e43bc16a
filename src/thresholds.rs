use crate::error::EngineError;
use ecobee_protocol::{EnvironmentFactor, EnvironmentParameters};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive `[min, max]` range, stored on disk as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl From<(f64, f64)> for ThresholdRange {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl From<ThresholdRange> for (f64, f64) {
    fn from(range: ThresholdRange) -> Self {
        (range.min, range.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRanges {
    pub temperature: ThresholdRange,
    pub humidity: ThresholdRange,
    pub flowers: ThresholdRange,
}

impl SpeciesRanges {
    pub fn range(&self, factor: EnvironmentFactor) -> &ThresholdRange {
        match factor {
            EnvironmentFactor::Temperature => &self.temperature,
            EnvironmentFactor::Humidity => &self.humidity,
            EnvironmentFactor::Flowers => &self.flowers,
        }
    }

    pub fn accepts(&self, env: &EnvironmentParameters, factor: EnvironmentFactor) -> bool {
        self.range(factor).contains(env.get(factor))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesThresholds {
    pub species: String,
    pub ranges: SpeciesRanges,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdProfile {
    entries: Vec<SpeciesThresholds>,
}

impl ThresholdProfile {
    pub fn push(&mut self, species: &str, ranges: SpeciesRanges) {
        self.entries.push(SpeciesThresholds {
            species: species.to_string(),
            ranges,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesThresholds> {
        self.entries.iter()
    }

    pub fn get(&self, species: &str) -> Option<&SpeciesRanges> {
        self.entries
            .iter()
            .find(|e| e.species == species)
            .map(|e| &e.ranges)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        let raw: IndexMap<String, SpeciesRanges> = serde_json::from_str(text).map_err(|e| {
            EngineError::configuration(format!("Could not parse threshold JSON: {e}"))
        })?;
        let mut ret = Self::default();
        for (species, ranges) in raw {
            for factor in EnvironmentFactor::ALL {
                let range = ranges.range(factor);
                if !range.is_well_formed() {
                    return Err(EngineError::configuration(format!(
                        "Invalid {factor} range [{}, {}] for species '{species}'",
                        range.min, range.max
                    )));
                }
            }
            ret.push(&species, ranges);
        }
        Ok(ret)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!(
                "Could not read threshold file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text)
    }
}
