//! Plain-data contracts shared between the EcoBEE engine and its callers.
//!
//! Nothing in here depends on the engine itself, so a front end (or the
//! external explanation service glue) can speak the same JSON without
//! linking the simulation code.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROTOCOL_VERSION: &str = "v1";

/// One of the environmental axes a species threshold box is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentFactor {
    Temperature,
    Humidity,
    Flowers,
}

impl EnvironmentFactor {
    pub const ALL: [EnvironmentFactor; 3] = [Self::Temperature, Self::Humidity, Self::Flowers];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Flowers => "flowers",
        }
    }
}

impl fmt::Display for EnvironmentFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentParameters {
    pub temperature: f64,
    pub humidity: f64,
    pub flowers: f64,
}

impl EnvironmentParameters {
    pub fn new(temperature: f64, humidity: f64, flowers: f64) -> Self {
        Self {
            temperature,
            humidity,
            flowers,
        }
    }

    pub fn get(&self, factor: EnvironmentFactor) -> f64 {
        match factor {
            EnvironmentFactor::Temperature => self.temperature,
            EnvironmentFactor::Humidity => self.humidity,
            EnvironmentFactor::Flowers => self.flowers,
        }
    }

    pub fn first_non_finite(&self) -> Option<EnvironmentFactor> {
        EnvironmentFactor::ALL
            .into_iter()
            .find(|factor| !self.get(*factor).is_finite())
    }
}

/// Terminal outcome of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationStatus {
    #[serde(rename = "match_found")]
    MatchFound,
    #[serde(rename = "no_targets_for_mutation")]
    NoTargets,
    #[serde(rename = "no_genes_mutated")]
    NoGenesMutated,
    #[serde(rename = "error_updating_tree")]
    ErrorUpdatingTree,
    #[serde(rename = "evolution_simulated")]
    EvolutionSimulated,
}

impl SimulationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MatchFound => "match_found",
            Self::NoTargets => "no_targets_for_mutation",
            Self::NoGenesMutated => "no_genes_mutated",
            Self::ErrorUpdatingTree => "error_updating_tree",
            Self::EvolutionSimulated => "evolution_simulated",
        }
    }

    pub fn tree_changed(self) -> bool {
        matches!(self, Self::EvolutionSimulated)
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to the external text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationRequest {
    pub environment: EnvironmentParameters,
    pub parent_species: Option<String>,
    pub evolved_species_name: Option<String>,
    #[serde(default)]
    pub mutated_genes: Vec<String>,
}
