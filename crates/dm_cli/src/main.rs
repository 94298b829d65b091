// crates/dm_cli/src/main.rs
//
// Exit codes, typed error mapping, logging setup, and the three run paths on either a
// square grid or an edge-list graph (--graph):
//   ensemble  → seed districting → chain → ensemble.csv
//   ising     → voter samples per minority proportion → samples.csv
//   run       → ensemble, then a proportion sweep scored against it → seats.csv
// Every path finishes with run_record.json (config, effective seed, artifact digests).

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const IO: i32 = 4;
    pub const ALGORITHM: i32 = 5;
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use args::{parse_and_validate as parse_cli, Args, Command};

use dm_algo::analysis::seat_sweep;
use dm_algo::ising::{EnergySample, IsingSimulation};
use dm_algo::{block_districting, generate_ensemble, region_growth, ChainStats};
use dm_core::{
    AdjacencyGraph, ChainRng, CoreError, Districting, Ensemble, Graph, GridGraph, IsingParams,
    RunConfig, SeedStrategy,
};
use dm_io::prelude::*;

const ENSEMBLE_CSV: &str = "ensemble.csv";
const SAMPLES_CSV: &str = "samples.csv";
const SEATS_CSV: &str = "seats.csv";
const RUN_RECORD: &str = "run_record.json";

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Bad config values, malformed JSON/CSV, argument combinations.
    Validation(String),
    /// Read/write/path failures.
    Io(String),
    /// The request was well-formed but the chain could not satisfy it.
    Algorithm(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "{m}"),
            MainError::Io(m) => write!(f, "{m}"),
            MainError::Algorithm(m) => write!(f, "{m}"),
        }
    }
}

impl From<CoreError> for MainError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidArgument(_) => MainError::Validation(e.to_string()),
            CoreError::Unsatisfiable(_)
            | CoreError::DegenerateChain(_)
            | CoreError::InvariantViolation(_) => MainError::Algorithm(e.to_string()),
        }
    }
}

impl From<IoError> for MainError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Path(_) => MainError::Io(e.to_string()),
            IoError::Json(_) | IoError::Csv { .. } | IoError::Invalid(_) => {
                MainError::Validation(e.to_string())
            }
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("dm: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };

    init_tracing(args.quiet);

    let rc = match run_once(&args) {
        Ok(record) => {
            if !args.quiet {
                println!("{}", record.display());
            }
            exitcodes::OK
        }
        Err(e) => {
            eprintln!("dm: error: {e}");
            map_error(&e)
        }
    };

    ExitCode::from(rc as u8)
}

fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::Io(_) => IO,
        MainError::Algorithm(_) => ALGORITHM,
    }
}

/// `RUST_LOG` wins when set; otherwise `info`, or `warn` under `--quiet`.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/* ----------------------------------- Run paths ----------------------------------- */

/// Returns the path of the run record written.
fn run_once(args: &Args) -> Result<PathBuf, MainError> {
    let mut cfg = load_config(args)?;
    let seed = args.seed.or(cfg.seed).unwrap_or_else(ChainRng::os_seed);
    cfg.seed = Some(seed);
    tracing::info!(seed, command = args.command.as_str(), "starting");

    fs::create_dir_all(&args.out)
        .map_err(|e| MainError::Io(format!("{}: {e}", args.out.display())))?;

    let (graph, grid) = topology(args, &mut cfg)?;
    let mut rng = ChainRng::from_seed_u64(seed);
    let mut record = RunRecord::new(args.command.as_str(), seed, cfg.clone());
    if let Some(path) = &args.graph {
        record.add_artifact("graph", path)?;
    }

    match args.command {
        Command::Ensemble => {
            let (ensemble, stats) = build_ensemble(&cfg, &graph, grid.as_ref(), &mut rng)?;
            let path = args.out.join(ENSEMBLE_CSV);
            write_ensemble_csv(&path, ensemble.iter())?;
            record.add_artifact("ensemble", &path)?;
            record.chain = Some(summarize(&ensemble, stats));
        }
        Command::Ising => {
            let path = args.out.join(SAMPLES_CSV);
            sample_voters(&cfg, &graph, &mut rng, &path)?;
            record.add_artifact("samples", &path)?;
        }
        Command::Run => {
            let (ensemble, stats) = build_ensemble(&cfg, &graph, grid.as_ref(), &mut rng)?;
            let path = args.out.join(ENSEMBLE_CSV);
            write_ensemble_csv(&path, ensemble.iter())?;
            record.add_artifact("ensemble", &path)?;
            record.chain = Some(summarize(&ensemble, stats));

            let plans = ensemble.thinned(cfg.thin_stride)?;
            tracing::info!(plans = plans.len(), stride = cfg.thin_stride, "scoring plans");
            let points = seat_sweep(
                &graph,
                &cfg.effective_proportions(),
                &cfg.ising,
                &cfg.sampling,
                &plans,
                &mut rng,
            )?;
            let path = args.out.join(SEATS_CSV);
            write_seat_points_csv(
                &path,
                points.iter().map(|p| (p.proportion, p.energy, p.expected_seats)),
            )?;
            record.add_artifact("seats", &path)?;
        }
    }

    let path = args.out.join(RUN_RECORD);
    record.write(&path)?;
    tracing::info!(record = %path.display(), "done");
    Ok(path)
}

fn load_config(args: &Args) -> Result<RunConfig, MainError> {
    let mut cfg = match &args.config {
        Some(p) => load_run_config(p)?,
        None => RunConfig::default(),
    };
    args.overrides.apply(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// The edge list from `--graph`, or the configured square grid. An edge list has no
/// block tiling, so its plans seed by region growth.
fn topology(
    args: &Args,
    cfg: &mut RunConfig,
) -> Result<(AdjacencyGraph, Option<GridGraph>), MainError> {
    match &args.graph {
        Some(path) => {
            let graph = read_edge_list_csv(path)?;
            tracing::info!(
                vertices = graph.vertex_count(),
                edges = graph.edge_count(),
                "edge-list graph loaded"
            );
            if cfg.seed_strategy == SeedStrategy::Blocks {
                tracing::info!("block seeding needs a square grid; using region growth");
                cfg.seed_strategy = SeedStrategy::RegionGrowth;
            }
            Ok((graph, None))
        }
        None => {
            let grid = GridGraph::new(cfg.grid_size, cfg.adjacency)?;
            Ok((grid.to_adjacency(), Some(grid)))
        }
    }
}

fn build_ensemble(
    cfg: &RunConfig,
    graph: &AdjacencyGraph,
    grid: Option<&GridGraph>,
    rng: &mut ChainRng,
) -> Result<(Ensemble, ChainStats), MainError> {
    let k = cfg.ensemble.num_districts;
    let seed: Districting = match (cfg.seed_strategy, grid) {
        (SeedStrategy::Blocks, Some(grid)) => block_districting(grid, k)?,
        (SeedStrategy::Blocks, None) => {
            return Err(MainError::Validation("block seeding needs a square grid".into()))
        }
        (SeedStrategy::RegionGrowth, _) => region_growth(graph, k, &cfg.growth, rng)?,
    };
    let chain_rng = ChainRng::from_seed_u64(rng.next_u64());
    let (ensemble, stats) = generate_ensemble(graph, seed, &cfg.ensemble, chain_rng)?;
    tracing::info!(
        plans = ensemble.len(),
        acceptance = stats.acceptance_rate(),
        "ensemble generated"
    );
    Ok((ensemble, stats))
}

/// One simulation per minority proportion, each on a stream forked from `rng`.
fn sample_voters(
    cfg: &RunConfig,
    graph: &AdjacencyGraph,
    rng: &mut ChainRng,
    path: &Path,
) -> Result<(), MainError> {
    let mut samples: Vec<EnergySample> = Vec::new();
    for p in cfg.effective_proportions() {
        let params = IsingParams { minority_proportion: p, ..cfg.ising.clone() };
        let child = ChainRng::from_seed_u64(rng.next_u64());
        let mut sim = IsingSimulation::new(graph, &params, child)?;
        for sample in sim.sampler(cfg.sampling.clone()) {
            samples.push(sample?);
        }
        tracing::info!(proportion = p, samples = samples.len(), "voter samples collected");
    }
    let rows: Vec<SampleRow<'_>> = samples
        .iter()
        .map(|s| SampleRow { target: s.target, energy: s.energy, config: &s.config })
        .collect();
    write_samples_csv(path, &rows)?;
    Ok(())
}

fn summarize(ensemble: &Ensemble, stats: ChainStats) -> ChainSummary {
    ChainSummary {
        samples: ensemble.len() as u64,
        proposals: stats.proposals,
        accepted: stats.accepted,
        rejected_balance: stats.rejected_balance,
        rejected_contiguity: stats.rejected_contiguity,
        stall_scans: stats.stall_scans,
    }
}
