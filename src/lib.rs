pub mod about;
pub mod config;
pub mod consensus;
pub mod error;
pub mod explanation;
pub mod fitness;
pub mod genes;
pub mod mutation;
pub mod naming;
pub mod newick;
pub mod phylogeny;
pub mod rules;
pub mod simulation;
pub mod thresholds;

pub use ecobee_protocol::{
    EnvironmentFactor, EnvironmentParameters, ExplanationRequest, SimulationStatus,
};
