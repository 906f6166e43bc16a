use crate::error::EngineError;
use crate::genes::{GeneRecord, GeneType, SpeciesGeneProfile};
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

pub type FitnessScores = IndexMap<String, f64>;

pub fn hamming_distance(a: &str, b: &str) -> Result<usize, EngineError> {
    if a.len() != b.len() {
        return Err(EngineError::invalid_input(format!(
            "Hamming distance needs equal lengths, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count())
}

/// Scores `mutated` against every species' own sequence of the same gene.
///
/// Species without that gene, or whose sequence length differs from the
/// mutated one, are left out of the result rather than scored zero.
pub fn evaluate_fitness(mutated: &GeneRecord, profile: &SpeciesGeneProfile) -> FitnessScores {
    let len = mutated.len();
    if len == 0 {
        return FitnessScores::new();
    }
    profile
        .records_for(mutated.gene_type())
        .filter_map(|record| {
            let dist = hamming_distance(mutated.sequence(), record.sequence()).ok()?;
            Some((record.species().to_string(), 1.0 - dist as f64 / len as f64))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentChoice {
    pub species: String,
    pub average_fitness: Option<f64>,
    pub scored_genes: usize,
    /// No species had any score, so the first profile species was taken.
    pub fallback: bool,
}

/// Picks the species with the best mean fitness across the mutated genes.
///
/// Ties resolve to the species declared first in `profile`. When no species
/// was scored at all the first profile species is returned with
/// `fallback` set. Returns `None` only for an empty profile.
pub fn select_parent(
    per_gene: &IndexMap<GeneType, FitnessScores>,
    profile: &SpeciesGeneProfile,
) -> Option<ParentChoice> {
    let mut best: Option<ParentChoice> = None;
    for species in profile.species_names() {
        let scores: Vec<f64> = per_gene
            .values()
            .filter_map(|scores| scores.get(species).copied())
            .collect();
        if scores.is_empty() {
            continue;
        }
        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        let better = best
            .as_ref()
            .and_then(|b| b.average_fitness)
            .map(|b| average > b)
            .unwrap_or(true);
        if better {
            best = Some(ParentChoice {
                species: species.to_string(),
                average_fitness: Some(average),
                scored_genes: scores.len(),
                fallback: false,
            });
        }
    }
    if best.is_some() {
        return best;
    }
    let first = profile.first_species()?;
    warn!("No species could be scored; falling back to first profile species '{first}'");
    Some(ParentChoice {
        species: first.to_string(),
        average_fitness: None,
        scored_genes: 0,
        fallback: true,
    })
}
