use crate::{
    config::{EcobeeConfig, SimulationParameters},
    consensus::{build_consensus, Consensus},
    error::{EngineError, ErrorCode},
    fitness::{evaluate_fitness, select_parent, FitnessScores},
    genes::{GeneRecord, GeneType, SpeciesGeneProfile},
    mutation::mutate_sequence,
    naming::{canonical_species_label, evolved_species_name},
    phylogeny::PhyloTree,
    rules::{find_matching_species, mutation_targets},
    thresholds::ThresholdProfile,
};
use ecobee_protocol::{EnvironmentParameters, ExplanationRequest, SimulationStatus};
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Serialize, Serializer};
use std::{
    panic::{self, AssertUnwindSafe},
    path::Path,
};

#[derive(Debug, Clone)]
pub struct SimulationContext {
    thresholds: ThresholdProfile,
    genes: SpeciesGeneProfile,
    parameters: SimulationParameters,
}

impl SimulationContext {
    /// Fails with `Configuration` when `parameters` do not validate.
    pub fn new(
        thresholds: ThresholdProfile,
        genes: SpeciesGeneProfile,
        parameters: SimulationParameters,
    ) -> Result<Self, EngineError> {
        parameters.validate()?;
        Ok(Self {
            thresholds,
            genes,
            parameters,
        })
    }

    pub fn load(config: &EcobeeConfig) -> Result<Self, EngineError> {
        let thresholds = ThresholdProfile::load_from_path(&config.data.threshold_file)?;
        let genes = SpeciesGeneProfile::load_from_dir(&config.data.fasta_dir)?;
        info!(
            "Loaded {} threshold boxes and genes for {} species",
            thresholds.len(),
            genes.len()
        );
        Self::new(thresholds, genes, config.simulation.clone())
    }

    pub fn thresholds(&self) -> &ThresholdProfile {
        &self.thresholds
    }

    pub fn genes(&self) -> &SpeciesGeneProfile {
        &self.genes
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    pub fn rng(&self) -> ChaCha20Rng {
        match self.parameters.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub status: SimulationStatus,
    pub environment: EnvironmentParameters,
    pub matching_species: Option<String>,
    pub parent_species: Option<String>,
    pub parent_fitness: Option<f64>,
    /// The parent was the first profile species because nothing could be scored.
    pub parent_fallback: bool,
    pub new_species_name: Option<String>,
    pub targeted_genes: Vec<GeneType>,
    pub mutated_genes: Vec<GeneType>,
    pub new_sequences: IndexMap<GeneType, String>,
    pub message: Option<String>,
    #[serde(serialize_with = "tree_as_newick")]
    pub tree: PhyloTree,
}

fn tree_as_newick<S: Serializer>(tree: &PhyloTree, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&tree.to_newick())
}

impl SimulationResult {
    fn unchanged(status: SimulationStatus, env: &EnvironmentParameters, tree: PhyloTree) -> Self {
        Self {
            status,
            environment: *env,
            matching_species: None,
            parent_species: None,
            parent_fitness: None,
            parent_fallback: false,
            new_species_name: None,
            targeted_genes: vec![],
            mutated_genes: vec![],
            new_sequences: IndexMap::new(),
            message: None,
            tree,
        }
    }

    pub fn explanation_request(&self) -> ExplanationRequest {
        ExplanationRequest {
            environment: self.environment,
            parent_species: self.parent_species.clone(),
            evolved_species_name: self.new_species_name.clone(),
            mutated_genes: self
                .mutated_genes
                .iter()
                .map(|g| g.as_str().to_string())
                .collect(),
        }
    }
}

pub struct Simulator<'a> {
    ctx: &'a SimulationContext,
}

impl<'a> Simulator<'a> {
    pub fn new(ctx: &'a SimulationContext) -> Self {
        Self { ctx }
    }

    /// Runs the pipeline on `tree`, which is returned inside the result,
    /// changed only when the status is `EvolutionSimulated`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        env: &EnvironmentParameters,
        tree: PhyloTree,
        rng: &mut R,
    ) -> Result<SimulationResult, EngineError> {
        if let Some(factor) = env.first_non_finite() {
            return Err(EngineError::invalid_input(format!(
                "Environment value for {factor} is not a finite number"
            )));
        }
        if self.ctx.genes.is_empty() {
            return Err(EngineError::data_unavailable(
                "Species gene data not provided or is empty.",
            ));
        }

        if let Some(species) = find_matching_species(env, &self.ctx.thresholds) {
            info!("Species '{species}' already fits the environment");
            let mut result = SimulationResult::unchanged(SimulationStatus::MatchFound, env, tree);
            result.matching_species = Some(species.to_string());
            return Ok(result);
        }

        let targets = mutation_targets(env, &self.ctx.thresholds);
        self.evolve(env, &targets, tree, rng)
    }

    pub fn run_from_path<R: Rng + ?Sized>(
        &self,
        env: &EnvironmentParameters,
        tree_path: &Path,
        rng: &mut R,
    ) -> Result<SimulationResult, EngineError> {
        let tree = PhyloTree::load_from_path(tree_path)?;
        self.run(env, tree, rng)
    }

    /// [`Self::run_from_path`] behind a panic boundary; a panic becomes an
    /// `Internal` error. The shared context is only ever borrowed immutably.
    pub fn run_guarded<R: Rng + ?Sized>(
        &self,
        env: &EnvironmentParameters,
        tree_path: &Path,
        rng: &mut R,
    ) -> Result<SimulationResult, EngineError> {
        guarded(|| self.run_from_path(env, tree_path, rng))
    }

    /// [`Self::run`] behind the same panic boundary as [`Self::run_guarded`].
    pub fn run_tree_guarded<R: Rng + ?Sized>(
        &self,
        env: &EnvironmentParameters,
        tree: PhyloTree,
        rng: &mut R,
    ) -> Result<SimulationResult, EngineError> {
        guarded(|| self.run(env, tree, rng))
    }

    pub(crate) fn evolve<R: Rng + ?Sized>(
        &self,
        env: &EnvironmentParameters,
        targets: &[GeneType],
        mut tree: PhyloTree,
        rng: &mut R,
    ) -> Result<SimulationResult, EngineError> {
        if targets.is_empty() {
            info!("Closest species has no out-of-range factor");
            return Ok(SimulationResult::unchanged(
                SimulationStatus::NoTargets,
                env,
                tree,
            ));
        }
        debug!("Mutation targets: {targets:?}");

        let genes = &self.ctx.genes;
        let mut mutated: IndexMap<GeneType, GeneRecord> = IndexMap::new();
        for &gene_type in targets {
            match build_consensus(genes, gene_type) {
                Consensus::Sequence(consensus) => {
                    let record =
                        mutate_sequence(&consensus, self.ctx.parameters.mutation_rate, rng);
                    mutated.insert(gene_type, record);
                }
                Consensus::NoData(reason) => {
                    warn!("Skipping {gene_type}: no consensus ({reason:?})");
                }
            }
        }
        if mutated.is_empty() {
            info!("No targeted gene had usable sequence data");
            let mut result =
                SimulationResult::unchanged(SimulationStatus::NoGenesMutated, env, tree);
            result.targeted_genes = targets.to_vec();
            return Ok(result);
        }

        let per_gene: IndexMap<GeneType, FitnessScores> = mutated
            .iter()
            .map(|(gene_type, record)| (*gene_type, evaluate_fitness(record, genes)))
            .collect();
        let parent = select_parent(&per_gene, genes)
            .ok_or_else(|| EngineError::internal("Failed to determine a valid parent species."))?;

        let new_name = evolved_species_name(&parent.species, &tree);
        let parent_label = canonical_species_label(&parent.species);
        debug!(
            "Parent '{}' (label '{parent_label}'), new species '{new_name}'",
            parent.species
        );

        // insert_branch leaves the tree untouched when it fails
        let inserted =
            tree.insert_branch(&parent_label, &new_name, self.ctx.parameters.branch_length);

        let mut result =
            SimulationResult::unchanged(SimulationStatus::EvolutionSimulated, env, tree);
        result.parent_species = Some(parent_label.clone());
        result.parent_fitness = parent.average_fitness;
        result.parent_fallback = parent.fallback;
        result.new_species_name = Some(new_name.clone());
        result.targeted_genes = targets.to_vec();
        result.mutated_genes = mutated.keys().copied().collect();
        result.new_sequences = mutated
            .iter()
            .map(|(gene_type, record)| (*gene_type, record.to_fasta()))
            .collect();

        match inserted {
            Ok(_) => {
                info!("Grafted '{new_name}' below '{parent_label}'");
                Ok(result)
            }
            Err(e) if e.code == ErrorCode::NotFound => {
                warn!("{}", e.message);
                result.status = SimulationStatus::ErrorUpdatingTree;
                result.message = Some(e.message);
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }
}

fn guarded<T>(work: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(EngineError::internal(format!(
            "Internal error during simulation: {detail}"
        )))
    })
}
