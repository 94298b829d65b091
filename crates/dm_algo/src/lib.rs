// crates/dm_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Algorithm layer over `dm_core`.
//!
//! Data flow: graph → seed districting → subgraph tracker ⇄ ensemble chain → ensemble
//! → analysis. The Ising sampler runs independently and feeds configurations to the
//! analysis alongside the ensemble. Everything here is single-threaded and pure apart
//! from the injected `ChainRng`; no I/O.

pub use dm_core::{CoreError, CoreResult};

// ----------------------------- Districting chain ---------------------------------

pub mod seed;
pub mod subgraph;
pub mod ensemble;

pub use seed::{block_districting, block_tiling, region_growth};
pub use subgraph::DistrictSubgraph;
pub use ensemble::{generate_ensemble, ChainStats, EnsembleGenerator, StepOutcome};

// ----------------------------- Ising voter configurations ------------------------

pub mod ising {
    pub mod energy;
    pub mod simulation;

    pub use energy::{EnergyCalculator, EnergyModel, Gamma, Hamiltonian, NormalizedGamma};
    pub use simulation::{
        collect_configurations, EnergySample, EnergySampler, IsingSimulation, SwapOutcome,
    };
}

// ----------------------------- Analysis -----------------------------------------

#[cfg(feature = "analysis")]
pub mod analysis {
    pub mod seats;
    pub mod entropy;
    pub mod metagraph;
    pub mod capy;
    pub mod votes;
    pub mod robustness;

    pub use capy::{capy_score, cross_energy, self_energy, VoteStep, VoteWalk, VoteWalkParams};
    pub use entropy::partition_entropy;
    pub use metagraph::{MetaGraph, MetaMove};
    pub use robustness::{
        earth_movers_distance, kl_divergence, mean_relative_change, symmetric_kl, vote_distance,
        DistanceMatrix, VoteDistance, VoteGroups,
    };
    pub use seats::{
        expected_minority_seat_shares, minority_seat_share, seat_sweep, SeatPoint,
    };
    pub use votes::{
        bucket_means, safe_seats, tossup_seats, vote_seat_share, Perturbation, PrecinctVotes,
    };
}
