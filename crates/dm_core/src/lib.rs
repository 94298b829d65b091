//! dm_core — Core types, graph backends, and deterministic RNG.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`dm_algo`, `dm_io`, `dm_cli`):
//!
//! - Error taxonomy (`CoreError`)
//! - Graph backends behind one `Graph` capability (implicit grid, explicit CSR)
//! - Districtings, immutable snapshots, and ensembles
//! - Voter configurations (minority/majority spins)
//! - Run parameters (serde derives gated behind the `serde` feature)
//! - Seedable RNG (ChaCha20) driving every random draw of the samplers

#![forbid(unsafe_code)]

pub mod errors;
pub mod graph;
pub mod districting;
pub mod voters;
pub mod params;
pub mod rng;

pub use errors::{CoreError, CoreResult};
pub use graph::{AdjacencyGraph, AdjacencyKind, Graph, GridGraph, VertexId};
pub use districting::{Districting, Ensemble, Label, Snapshot};
pub use voters::{Spin, VoterConfig};
pub use params::{
    linspace, EnergyKind, EnsembleParams, GrowthParams, IsingParams, RunConfig, SamplingPlan,
    SeedStrategy,
};
pub use rng::ChainRng;
