// crates/dm_cli/src/args.rs
//
// CLI argument surface: subcommands, shared flags, seed parsing, and folding
// command-line overrides into a `RunConfig`.
//
// - --config is optional; missing fields and a missing flag both fall back to defaults
// - --graph swaps the square grid for an edge-list CSV
// - --seed overrides the config seed (u64 decimal or 0x-hex up to 16 nybbles)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use dm_core::{AdjacencyKind, EnergyKind, RunConfig, SeedStrategy};

/// Parsed CLI arguments.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "dm",
    disable_help_subcommand = true,
    about = "Seeded districting ensembles and Ising voter samples on grids and edge-list graphs"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Run configuration JSON (omitted fields take their defaults).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Edge-list CSV (`source,target` header) used instead of the square grid.
    /// Seeding switches to region growth.
    #[arg(long, global = true)]
    pub graph: Option<PathBuf>,

    /// Output directory (created if missing).
    #[arg(long, global = true, default_value = ".")]
    pub out: PathBuf,

    /// Chain seed override. Accepts decimal u64 or 0x-hex (≤16 hex digits).
    #[arg(long, global = true, value_parser = parse_seed)]
    pub seed: Option<u64>,

    /// Only warnings and errors on stderr.
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Generate a districting ensemble (ensemble.csv).
    Ensemble,
    /// Sample voter configurations across energy targets (samples.csv).
    Ising,
    /// Ensemble, then a minority-proportion sweep scored against it (ensemble.csv, seats.csv).
    Run,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Ensemble => "ensemble",
            Command::Ising => "ising",
            Command::Run => "run",
        }
    }
}

/// Config fields settable from the command line. Unset flags leave the config alone.
#[derive(Debug, clap::Args, Clone, Default)]
pub struct Overrides {
    /// Grid side length n (n×n vertices).
    #[arg(long, global = true)]
    pub grid_size: Option<usize>,
    /// rook | queen
    #[arg(long, global = true, value_parser = parse_adjacency)]
    pub adjacency: Option<AdjacencyKind>,
    /// blocks | region-growth
    #[arg(long, global = true, value_parser = parse_seed_strategy)]
    pub seed_strategy: Option<SeedStrategy>,
    /// Number of districts k.
    #[arg(long, global = true)]
    pub districts: Option<u32>,
    /// Ensemble size (distinct plans when --unique).
    #[arg(long, global = true)]
    pub size: Option<usize>,
    /// District size tolerance around |V|/k.
    #[arg(long, global = true)]
    pub tolerance: Option<usize>,
    /// Collect distinct plans only.
    #[arg(long, global = true)]
    pub unique: bool,
    /// Keep every n-th plan for seat scoring.
    #[arg(long, global = true)]
    pub thin: Option<usize>,
    /// hamiltonian | gamma | normalized-gamma
    #[arg(long, global = true, value_parser = parse_energy)]
    pub energy: Option<EnergyKind>,
    /// Metropolis temperature.
    #[arg(long, global = true)]
    pub temperature: Option<f64>,
    /// Minority proportion; repeat to sweep several.
    #[arg(long = "proportion", global = true)]
    pub proportions: Vec<f64>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut RunConfig) {
        if let Some(n) = self.grid_size {
            cfg.grid_size = n;
        }
        if let Some(a) = self.adjacency {
            cfg.adjacency = a;
        }
        if let Some(s) = self.seed_strategy {
            cfg.seed_strategy = s;
        }
        if let Some(k) = self.districts {
            cfg.ensemble.num_districts = k;
        }
        if let Some(n) = self.size {
            cfg.ensemble.ensemble_size = n;
        }
        if let Some(t) = self.tolerance {
            cfg.ensemble.balance_tolerance = t;
        }
        if self.unique {
            cfg.ensemble.unique = true;
        }
        if let Some(s) = self.thin {
            cfg.thin_stride = s;
        }
        if let Some(e) = self.energy {
            cfg.ising.energy = e;
        }
        if let Some(t) = self.temperature {
            cfg.ising.temperature = t;
        }
        match self.proportions.as_slice() {
            [] => {}
            [p] => {
                cfg.ising.minority_proportion = *p;
                cfg.proportions.clear();
            }
            many => {
                cfg.ising.minority_proportion = many[0];
                cfg.proportions = many.to_vec();
            }
        }
    }
}

/// Errors surfaced by argument validation.
#[derive(Debug)]
pub enum CliError {
    NotADirectory(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NotADirectory(p) => write!(f, "output path is not a directory: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Seed parser: decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

fn parse_adjacency(s: &str) -> Result<AdjacencyKind, String> {
    s.parse::<AdjacencyKind>().map_err(|e| e.to_string())
}

fn parse_energy(s: &str) -> Result<EnergyKind, String> {
    s.parse::<EnergyKind>().map_err(|e| e.to_string())
}

fn parse_seed_strategy(s: &str) -> Result<SeedStrategy, String> {
    match s.trim() {
        "blocks" => Ok(SeedStrategy::Blocks),
        "region-growth" => Ok(SeedStrategy::RegionGrowth),
        other => Err(format!("unknown seed strategy: {other}")),
    }
}

/// Entry point used by main.rs. Clap handles usage errors itself (exit 2).
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    validate(&args)?;
    Ok(args)
}

fn validate(args: &Args) -> Result<(), CliError> {
    if args.out.exists() && !args.out.is_dir() {
        return Err(CliError::NotADirectory(args.out.display().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_parser_decimal_and_hex() {
        assert_eq!(parse_seed("42").unwrap(), 42u64);
        assert_eq!(parse_seed("0x2A").unwrap(), 42u64);
        assert!(parse_seed("0x").is_err());
        assert!(parse_seed("0xFFFFFFFFFFFFFFFFF").is_err()); // 17 nybbles
        assert!(parse_seed("-1").is_err());
        assert!(parse_seed("  ").is_err());
    }

    #[test]
    fn out_must_not_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, b"").unwrap();
        let args = Args::try_parse_from(["dm", "ensemble", "--out", file.to_str().unwrap()]).unwrap();
        assert!(matches!(validate(&args), Err(CliError::NotADirectory(_))));
        let args = Args::try_parse_from(["dm", "ensemble", "--out", dir.path().to_str().unwrap()]).unwrap();
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn graph_flag_is_global() {
        let args = Args::try_parse_from(["dm", "ensemble", "--graph", "edges.csv"]).unwrap();
        assert_eq!(args.graph, Some(PathBuf::from("edges.csv")));
    }

    #[test]
    fn flags_after_the_subcommand_override_the_config() {
        let args = Args::try_parse_from([
            "dm", "run", "--grid-size", "6", "--districts", "3", "--energy", "gamma",
            "--proportion", "0.2", "--proportion", "0.4", "--seed", "0x10",
        ])
        .unwrap();
        assert_eq!(args.command, Command::Run);
        assert_eq!(args.seed, Some(16));

        let mut cfg = RunConfig::default();
        args.overrides.apply(&mut cfg);
        assert_eq!(cfg.grid_size, 6);
        assert_eq!(cfg.ensemble.num_districts, 3);
        assert_eq!(cfg.ising.energy, EnergyKind::Gamma);
        assert_eq!(cfg.effective_proportions(), vec![0.2, 0.4]);
        assert_eq!(cfg.ensemble.balance_tolerance, 1);
    }

    #[test]
    fn single_proportion_replaces_the_sweep() {
        let args = Args::try_parse_from(["dm", "ising", "--proportion", "0.3"]).unwrap();
        let mut cfg = RunConfig { proportions: vec![0.1, 0.2], ..RunConfig::default() };
        args.overrides.apply(&mut cfg);
        assert_eq!(cfg.effective_proportions(), vec![0.3]);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(Args::try_parse_from(["dm", "ensemble", "--adjacency", "hex"]).is_err());
        assert!(Args::try_parse_from(["dm", "ising", "--energy", "potts"]).is_err());
        assert!(Args::try_parse_from(["dm", "ensemble", "--seed-strategy", "spiral"]).is_err());
        assert!(Args::try_parse_from(["dm"]).is_err());
    }
}
