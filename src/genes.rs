use crate::error::EngineError;
use anyhow::{anyhow, bail};
use bio::io::fasta;
use ecobee_protocol::EnvironmentFactor;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, fs::File, path::Path};

pub const FASTA_EXTENSIONS: [&str; 2] = ["fasta", "fna"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeneType {
    #[serde(rename = "Hsp90")]
    Hsp90,
    #[serde(rename = "AQP")]
    Aqp,
    #[serde(rename = "OR")]
    Or,
}

impl GeneType {
    pub const ALL: [GeneType; 3] = [Self::Hsp90, Self::Aqp, Self::Or];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hsp90 => "Hsp90",
            Self::Aqp => "AQP",
            Self::Or => "OR",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let norm = text.trim().to_ascii_uppercase();
        match norm.as_str() {
            "HSP90" => Some(Self::Hsp90),
            "AQP" => Some(Self::Aqp),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn for_factor(factor: EnvironmentFactor) -> Self {
        match factor {
            EnvironmentFactor::Temperature => Self::Hsp90,
            EnvironmentFactor::Humidity => Self::Aqp,
            EnvironmentFactor::Flowers => Self::Or,
        }
    }
}

impl fmt::Display for GeneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    species: String,
    gene_type: GeneType,
    id: String,
    description: Option<String>,
    sequence: String,
}

impl GeneRecord {
    pub fn new(species: &str, gene_type: GeneType, id: &str, sequence: &str) -> Self {
        Self {
            species: species.to_string(),
            gene_type,
            id: id.to_string(),
            description: None,
            sequence: sequence.to_string(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn from_fasta_record(species: &str, gene_type: GeneType, record: &fasta::Record) -> Self {
        Self {
            species: species.to_string(),
            gene_type,
            id: record.id().to_string(),
            description: record.desc().map(|d| d.to_string()),
            sequence: String::from_utf8_lossy(record.seq()).to_ascii_uppercase(),
        }
    }

    #[inline(always)]
    pub fn species(&self) -> &str {
        &self.species
    }

    #[inline(always)]
    pub fn gene_type(&self) -> GeneType {
        self.gene_type
    }

    #[inline(always)]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline(always)]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn to_fasta(&self) -> String {
        format!(">{}\n{}", self.id, self.sequence)
    }
}

/// Species name -> gene type -> record, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesGeneProfile {
    species: IndexMap<String, IndexMap<GeneType, GeneRecord>>,
}

impl SpeciesGeneProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = GeneRecord>) -> Self {
        let mut ret = Self::new();
        for record in records {
            ret.insert(record);
        }
        ret
    }

    pub fn insert(&mut self, record: GeneRecord) {
        self.species
            .entry(record.species.clone())
            .or_default()
            .insert(record.gene_type, record);
    }

    pub fn get(&self, species: &str, gene_type: GeneType) -> Option<&GeneRecord> {
        self.species.get(species)?.get(&gene_type)
    }

    pub fn species_names(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(|s| s.as_str())
    }

    pub fn first_species(&self) -> Option<&str> {
        self.species.keys().next().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn records_for(&self, gene_type: GeneType) -> impl Iterator<Item = &GeneRecord> {
        self.species
            .values()
            .filter_map(move |genes| genes.get(&gene_type))
    }

    /// Loads `<dir>/<GENE>/<Species>.fasta|.fna`, one record per file.
    ///
    /// Gene directories that do not exist are skipped. Files inside a gene
    /// directory are read in file-name order so that species order does not
    /// depend on the file system.
    pub fn load_from_dir(dir: &Path) -> Result<Self, EngineError> {
        if !dir.is_dir() {
            return Err(EngineError::configuration(format!(
                "Gene sequence directory '{}' does not exist",
                dir.display()
            )));
        }
        let mut ret = Self::new();
        for gene_type in GeneType::ALL {
            let folder = dir.join(gene_type.as_str());
            if !folder.is_dir() {
                debug!("No gene folder for {gene_type} at '{}'", folder.display());
                continue;
            }
            let entries = std::fs::read_dir(&folder).map_err(|e| {
                EngineError::configuration(format!(
                    "Could not list gene folder '{}': {e}",
                    folder.display()
                ))
            })?;
            let paths = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_fasta_path(path))
                .sorted();
            for path in paths {
                let Some(species) = path.file_stem().map(|s| s.to_string_lossy().to_string())
                else {
                    continue;
                };
                let record = read_single_fasta_record(&path).map_err(|e| {
                    EngineError::configuration(format!(
                        "Could not read gene file '{}': {e}",
                        path.display()
                    ))
                })?;
                let gene = GeneRecord::from_fasta_record(&species, gene_type, &record);
                if gene.is_empty() {
                    warn!("Empty {gene_type} sequence for species '{species}'");
                }
                ret.insert(gene);
            }
        }
        debug!(
            "Loaded gene profile for {} species from '{}'",
            ret.len(),
            dir.display()
        );
        Ok(ret)
    }
}

fn is_fasta_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FASTA_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn read_single_fasta_record(path: &Path) -> anyhow::Result<fasta::Record> {
    let file = File::open(path)?;
    let mut records = fasta::Reader::new(file).records();
    let record = records
        .next()
        .ok_or_else(|| anyhow!("no FASTA record found"))??;
    if records.next().is_some() {
        bail!("expected exactly one FASTA record");
    }
    record.check().map_err(|e| anyhow!("{e}"))?;
    Ok(record)
}
