//! crates/dm_core/src/params.rs
//! Run parameters with safe defaults and constructor-time validation.
//!
//! Notes:
//! - `balance_tolerance = 1` reproduces the classic flip chain: a flip may
//!   leave the base district one over target and the source one under.
//! - `seed` is optional everywhere; drivers resolve a missing seed once and
//!   record the resolved value alongside the artifacts.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};
use crate::graph::AdjacencyKind;

/* ------------------------------ Ensemble chain ------------------------------ */

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnsembleParams {
    pub num_districts: u32,
    /// Number of snapshots to collect, the seed districting included.
    pub ensemble_size: usize,
    pub balance_tolerance: usize,
    /// Return a deduplicated set instead of the raw sequence.
    pub unique: bool,
    /// Consecutive non-accepted proposals before an exhaustive move scan.
    pub stall_budget: u64,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            num_districts: 6,
            ensemble_size: 10_000,
            balance_tolerance: 1,
            unique: false,
            stall_budget: 100_000,
        }
    }
}

impl EnsembleParams {
    pub fn validate(&self) -> CoreResult<()> {
        if self.num_districts == 0 {
            return Err(CoreError::invalid("num_districts must be >= 1"));
        }
        if self.ensemble_size == 0 {
            return Err(CoreError::invalid("ensemble_size must be >= 1"));
        }
        if self.stall_budget == 0 {
            return Err(CoreError::invalid("stall_budget must be >= 1"));
        }
        Ok(())
    }
}

/* ------------------------------- Seed strategy ------------------------------ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SeedStrategy {
    /// Rectangular block tiling (square grids only).
    #[default]
    Blocks,
    /// Randomized region growth with swap repair (any connected graph).
    RegionGrowth,
}

/// Retry budget for randomized region growth.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GrowthParams {
    pub max_attempts: u32,
    /// Rounds per attempt; `None` means `4·|V| + 64`.
    pub round_budget: Option<usize>,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self { max_attempts: 8, round_budget: None }
    }
}

impl GrowthParams {
    pub fn rounds_for(&self, vertex_count: usize) -> usize {
        self.round_budget.unwrap_or(4 * vertex_count + 64)
    }
}

/* ------------------------------- Ising energies ----------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EnergyKind {
    Hamiltonian,
    Gamma,
    #[default]
    NormalizedGamma,
}

impl EnergyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnergyKind::Hamiltonian => "hamiltonian",
            EnergyKind::Gamma => "gamma",
            EnergyKind::NormalizedGamma => "normalized-gamma",
        }
    }
}

impl fmt::Display for EnergyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergyKind {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hamiltonian" => Ok(EnergyKind::Hamiltonian),
            "gamma" => Ok(EnergyKind::Gamma),
            "normalized-gamma" => Ok(EnergyKind::NormalizedGamma),
            other => Err(CoreError::invalid(format!("invalid energy type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IsingParams {
    /// Share of vertices carrying the minority spin; count is `floor(|V|·p)`.
    pub minority_proportion: f64,
    pub energy: EnergyKind,
    pub temperature: f64,
}

impl Default for IsingParams {
    fn default() -> Self {
        Self {
            minority_proportion: 0.4,
            energy: EnergyKind::NormalizedGamma,
            temperature: 0.25,
        }
    }
}

impl IsingParams {
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.minority_proportion) {
            return Err(CoreError::invalid(format!(
                "minority_proportion {} outside [0, 1]",
                self.minority_proportion
            )));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(CoreError::invalid(format!(
                "temperature must be finite and > 0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// `floor(vertex_count · p)`.
    pub fn minority_count(&self, vertex_count: usize) -> usize {
        (vertex_count as f64 * self.minority_proportion).floor() as usize
    }
}

/// Cadence of the target-energy sampling driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SamplingPlan {
    pub targets: Vec<f64>,
    pub warmup_steps: usize,
    pub samples_per_target: usize,
    pub steps_between_samples: usize,
}

impl Default for SamplingPlan {
    fn default() -> Self {
        Self {
            targets: linspace(0.0, 1.0, 20),
            warmup_steps: 1000,
            samples_per_target: 40,
            steps_between_samples: 100,
        }
    }
}

impl SamplingPlan {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(t) = self.targets.iter().find(|t| !t.is_finite()) {
            return Err(CoreError::invalid(format!("target energy {t} is not finite")));
        }
        Ok(())
    }

    pub fn total_samples(&self) -> usize {
        self.targets.len() * self.samples_per_target
    }
}

/// `n` evenly spaced values from `start` to `stop`, both ends included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i + 1 == n { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/* --------------------------------- Full run --------------------------------- */

/// Everything a driver needs for: ensemble → Ising sweep → expected seats.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    pub grid_size: usize,
    pub adjacency: AdjacencyKind,
    pub seed_strategy: SeedStrategy,
    pub growth: GrowthParams,
    pub ensemble: EnsembleParams,
    pub ising: IsingParams,
    pub sampling: SamplingPlan,
    /// Minority proportions to sweep; empty means `[ising.minority_proportion]`.
    pub proportions: Vec<f64>,
    /// Keep every `thin_stride`-th districting for seat analysis.
    pub thin_stride: usize,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            grid_size: 18,
            adjacency: AdjacencyKind::Rook,
            seed_strategy: SeedStrategy::Blocks,
            growth: GrowthParams::default(),
            ensemble: EnsembleParams::default(),
            ising: IsingParams::default(),
            sampling: SamplingPlan::default(),
            proportions: Vec::new(),
            thin_stride: 1,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.grid_size == 0 {
            return Err(CoreError::invalid("grid_size must be >= 1"));
        }
        if self.thin_stride == 0 {
            return Err(CoreError::invalid("thin_stride must be >= 1"));
        }
        self.ensemble.validate()?;
        self.ising.validate()?;
        self.sampling.validate()?;
        for p in &self.proportions {
            IsingParams { minority_proportion: *p, ..self.ising.clone() }.validate()?;
        }
        Ok(())
    }

    /// The sweep actually run.
    pub fn effective_proportions(&self) -> Vec<f64> {
        if self.proportions.is_empty() {
            vec![self.ising.minority_proportion]
        } else {
            self.proportions.clone()
        }
    }
}
