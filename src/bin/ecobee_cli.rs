use anyhow::{anyhow, bail, Result};
use ecobee::{
    about,
    config::{DataPaths, EcobeeConfig},
    consensus::{build_consensus, Consensus},
    explanation::build_explanation_prompt,
    genes::{GeneType, SpeciesGeneProfile},
    phylogeny::PhyloTree,
    rules::{closest_species, find_matching_species, in_range_count, mutation_targets},
    simulation::{SimulationContext, Simulator},
    thresholds::ThresholdProfile,
    EnvironmentParameters,
};
use log::debug;
use serde::Serialize;
use std::{
    env,
    path::{Path, PathBuf},
};

const DEFAULT_CONFIG_PATH: &str = "ecobee.json";

#[derive(Serialize)]
struct MatchReport<'a> {
    environment: EnvironmentParameters,
    matching_species: Option<&'a str>,
}

#[derive(Serialize)]
struct TargetReport<'a> {
    environment: EnvironmentParameters,
    closest_species: Option<&'a str>,
    parameters_in_range: usize,
    targets: Vec<GeneType>,
}

#[derive(Serialize)]
struct ConsensusReport {
    gene_type: GeneType,
    species_count: usize,
    consensus: Option<String>,
}

#[derive(Serialize)]
struct TreeSummary<'a> {
    clade_count: usize,
    leaf_count: usize,
    leaves: Vec<&'a str>,
}

struct GlobalArgs {
    config: EcobeeConfig,
    rest: Vec<String>,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  ecobee_cli --version\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] default-config [OUTPUT.json]\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] match T H F\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] targets T H F\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] consensus GENE\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] tree-summary\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] simulate T H F [--seed N] [--write-tree PATH]\n  \
  ecobee_cli [--config PATH] [--data-dir DIR] prompt T H F [--seed N]\n\n  \
  T H F are temperature, humidity and flower availability.\n  \
  Set RUST_LOG=debug to trace the pipeline."
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn parse_global_args(args: &[String]) -> Result<GlobalArgs> {
    let mut config_path: Option<PathBuf> = None;
    let mut data_dir: Option<PathBuf> = None;
    let mut idx = 1;
    while idx < args.len() {
        match args[idx].as_str() {
            "--config" => {
                let value = args.get(idx + 1).ok_or_else(|| anyhow!("Missing path for --config"))?;
                config_path = Some(PathBuf::from(value));
                idx += 2;
            }
            "--data-dir" => {
                let value = args
                    .get(idx + 1)
                    .ok_or_else(|| anyhow!("Missing directory for --data-dir"))?;
                data_dir = Some(PathBuf::from(value));
                idx += 2;
            }
            _ => break,
        }
    }

    let mut config = match config_path {
        Some(path) => EcobeeConfig::load_from_path(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            EcobeeConfig::load_from_path(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => EcobeeConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data = DataPaths::under(&dir);
    }
    Ok(GlobalArgs {
        config,
        rest: args[idx..].to_vec(),
    })
}

fn parse_environment(args: &[String]) -> Result<EnvironmentParameters> {
    if args.len() < 3 {
        bail!("Expected three numbers: temperature humidity flowers");
    }
    let value = |i: usize, name: &str| -> Result<f64> {
        args[i]
            .parse::<f64>()
            .map_err(|_| anyhow!("Invalid {name} '{}', expected a number", args[i]))
    };
    Ok(EnvironmentParameters::new(
        value(0, "temperature")?,
        value(1, "humidity")?,
        value(2, "flowers")?,
    ))
}

fn option_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn load_context(config: &mut EcobeeConfig, args: &[String]) -> Result<SimulationContext> {
    if let Some(seed) = option_value(args, "--seed") {
        let seed = seed
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid seed '{seed}'"))?;
        config.simulation.seed = Some(seed);
    }
    Ok(SimulationContext::load(config)?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        bail!("Missing command");
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", about::version_cli_text());
        return Ok(());
    }

    let GlobalArgs { mut config, rest } = parse_global_args(&args)?;
    let Some(command) = rest.first() else {
        usage();
        bail!("Missing command");
    };
    let params = &rest[1..];
    debug!("Running '{command}' with data paths {:?}", config.data);

    match command.as_str() {
        "default-config" => match params.first() {
            Some(path) => {
                EcobeeConfig::default().save_to_path(Path::new(path))?;
                println!("Wrote default configuration to '{path}'");
                Ok(())
            }
            None => print_json(&EcobeeConfig::default()),
        },
        "match" => {
            let env = parse_environment(params)?;
            let thresholds = ThresholdProfile::load_from_path(&config.data.threshold_file)?;
            print_json(&MatchReport {
                environment: env,
                matching_species: find_matching_species(&env, &thresholds),
            })
        }
        "targets" => {
            let env = parse_environment(params)?;
            let thresholds = ThresholdProfile::load_from_path(&config.data.threshold_file)?;
            let closest = closest_species(&env, &thresholds);
            print_json(&TargetReport {
                environment: env,
                closest_species: closest.map(|c| c.species.as_str()),
                parameters_in_range: closest.map(|c| in_range_count(&env, c)).unwrap_or(0),
                targets: mutation_targets(&env, &thresholds),
            })
        }
        "consensus" => {
            let gene_name = params.first().ok_or_else(|| anyhow!("Missing gene type"))?;
            let gene_type = GeneType::parse(gene_name).ok_or_else(|| {
                anyhow!("Unknown gene type '{gene_name}', expected Hsp90, AQP or OR")
            })?;
            let genes = SpeciesGeneProfile::load_from_dir(&config.data.fasta_dir)?;
            let consensus = build_consensus(&genes, gene_type);
            if let Consensus::NoData(reason) = &consensus {
                debug!("No {gene_type} consensus: {reason:?}");
            }
            print_json(&ConsensusReport {
                gene_type,
                species_count: genes.records_for(gene_type).count(),
                consensus: consensus.record().map(|r| r.to_fasta()),
            })
        }
        "tree-summary" => {
            let tree = PhyloTree::load_from_path(&config.data.tree_file)?;
            print_json(&TreeSummary {
                clade_count: tree.clade_count(),
                leaf_count: tree.leaf_count(),
                leaves: tree.leaf_names(),
            })
        }
        "simulate" => {
            let env = parse_environment(params)?;
            let ctx = load_context(&mut config, params)?;
            let mut rng = ctx.rng();
            let result = Simulator::new(&ctx).run_guarded(&env, &config.data.tree_file, &mut rng)?;
            if let Some(path) = option_value(params, "--write-tree") {
                if result.status.tree_changed() {
                    result.tree.save_to_path(Path::new(path))?;
                    eprintln!("Wrote updated tree to '{path}'");
                } else {
                    eprintln!("Tree unchanged ({}), nothing written", result.status);
                }
            }
            print_json(&result)
        }
        "prompt" => {
            let env = parse_environment(params)?;
            let ctx = load_context(&mut config, params)?;
            let mut rng = ctx.rng();
            let result = Simulator::new(&ctx).run_guarded(&env, &config.data.tree_file, &mut rng)?;
            println!("{}", build_explanation_prompt(&result.explanation_request()));
            Ok(())
        }
        _ => {
            usage();
            bail!("Unknown command '{command}'")
        }
    }
}
